//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```rust,no_run
//! use smithsnmp::prelude::*;
//! ```
//!
//! This imports:
//! - Core types: [`Agent`], [`Oid`], [`Value`], [`VarBind`]
//! - Handler surface: [`InstanceHandler`], [`ScalarHandler`], [`TableHandler`]
//! - Error handling: [`Error`], [`Result`], [`ErrorStatus`]
//! - V3 protocols: [`AuthProtocol`], [`PrivProtocol`]
//! - The [`oid!`] macro for OID construction

pub use crate::agent::{Agent, AgentBuilder, SecurityMode};
pub use crate::error::{Error, ErrorStatus, Result};
pub use crate::handler::{InstanceHandler, ScalarHandler, TableHandler};
pub use crate::mib::Access;
pub use crate::oid::Oid;
pub use crate::v3::{AuthProtocol, PrivProtocol};
pub use crate::value::Value;
pub use crate::varbind::VarBind;
pub use crate::version::Version;

#[doc(no_inline)]
pub use crate::oid;
