//! Handler types and traits for SNMP MIB operations.
//!
//! Handlers supply the values behind registered MIB instances:
//!
//! - [`InstanceHandler`] - trait invoked for GET, GETNEXT, and SET
//! - [`GetResult`], [`NextResult`], [`SetResult`] - operation results
//! - [`ScalarHandler`], [`TableHandler`] - ready-made implementations
//! - [`SuffixTable`] - sorted storage for custom table handlers
//!
//! A handler is registered at an OID prefix and addressed by the suffix of
//! the query OID beyond that prefix. The engine calls it synchronously, one
//! varbind at a time; handlers must not re-enter the engine.
//!
//! # Example
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
//! ```

mod results;
mod table;
mod traits;

pub use results::{GetResult, NextResult, SetResult};
pub use table::{ScalarHandler, SuffixTable, TableHandler};
pub use traits::InstanceHandler;
