//! An embeddable SNMP agent engine.
//!
//! smithsnmp implements the message-processing core of an SNMP agent: it
//! parses SNMPv1/v2c/v3 datagrams, authenticates and authorizes them
//! against registered communities and USM users, resolves the requested
//! OIDs in a MIB tree of handler-backed instances, and produces the
//! wire-format response. GET, GETNEXT, SET, and GETBULK are serviced with
//! the response conventions of RFC 3416.
//!
//! # Quick start
//!
//! ```rust
//! use smithsnmp::agent::Agent;
//! use smithsnmp::handler::ScalarHandler;
//! use smithsnmp::{Value, oid};
//!
//! let agent = Agent::builder()
//!     .community_read(oid!(1, 3, 6, 1), "public")
//!     .register(
//!         oid!(1, 3, 6, 1, 2, 1, 1, 1),
//!         ScalarHandler::read_only(|| Value::from("SmithSNMP")),
//!     )
//!     .build();
//!
//! // Feed it datagrams; every Some(reply) goes back to the sender.
//! # let datagram: &[u8] = &[];
//! if let Some(reply) = agent.process(datagram) {
//!     // send reply
//! }
//! ```
//!
//! Serving UDP is one call more ([`transport::serve`]); the engine itself
//! is transport-agnostic and processes one datagram at a time.
//!
//! # Module map
//!
//! - [`ber`] - tag/length/value codec (reverse-buffer encoder, strict decoder)
//! - [`oid`] - the OID value type
//! - [`value`], [`varbind`] - SNMP values and bindings
//! - [`mib`] - the MIB tree and view-based access control
//! - [`v3`] - USM key localization, HMAC authentication, AES privacy
//! - [`message`] - datagram parsing and response serialization
//! - [`agent`] - the engine and its builder
//! - [`handler`] - the instance-handler contract and stock handlers
//! - [`transport`] - a minimal UDP serve loop

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod agent;
pub mod ber;
pub mod error;
pub mod handler;
pub mod message;
pub mod mib;
pub mod oid;
pub mod prelude;
pub mod transport;
pub mod util;
pub mod v3;
pub mod value;
pub mod varbind;
pub mod version;

pub use error::{Error, ErrorStatus, Result};
pub use oid::Oid;
pub use value::Value;
pub use varbind::VarBind;
pub use version::Version;
