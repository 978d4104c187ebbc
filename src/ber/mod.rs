//! BER (Basic Encoding Rules) codec for SNMP.
//!
//! Encoding uses a single backward-writing pass ([`EncodeBuf`]); decoding is
//! strict X.690 with the few permissive exceptions net-snmp established
//! (unsigned values with a set top bit).

mod decode;
mod encode;
mod length;
pub mod tag;

pub use decode::*;
pub use encode::*;
pub use length::*;
pub use tag::{is_constructed, is_exception, is_value};
