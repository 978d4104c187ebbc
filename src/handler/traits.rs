//! InstanceHandler trait.

use crate::oid::Oid;
use crate::value::Value;

use super::{GetResult, NextResult, SetResult};

/// Handler for the instances below one registered MIB node.
///
/// A handler is attached to an instance node with
/// [`AgentBuilder::register`](crate::agent::AgentBuilder::register) and is
/// addressed by the *suffix* of the query OID beyond the registered prefix.
/// A scalar registered at `1.3.6.1.2.1.1.1` sees suffix `0` for
/// `sysDescr.0`; a table column registered at `1.3.6.1.2.1.2.2.1.1` sees
/// the row index.
///
/// # Execution model
///
/// The engine is single-threaded and calls handlers synchronously, one
/// varbind at a time. Handlers receive no engine handle and must not
/// re-enter the engine. `Send + Sync` is required because the registries
/// are shared with the transport task.
///
/// # GETNEXT and ordering
///
/// [`next`](InstanceHandler::next) drives GETNEXT/GETBULK walks. Given
/// `None` it returns the handler's first instance; given `Some(suffix)` it
/// returns the least instance strictly greater than that suffix. Suffixes
/// compare arc-by-arc as unsigned integers, shorter prefixes first.
///
/// # Example
///
/// ```rust
/// use smithsnmp::handler::{GetResult, InstanceHandler, NextResult};
/// use smithsnmp::{Oid, Value, oid};
///
/// struct Uptime;
///
/// impl InstanceHandler for Uptime {
///     fn get(&self, suffix: &Oid) -> GetResult {
///         if suffix.arcs() == [0] {
///             GetResult::Value(Value::TimeTicks(12345))
///         } else {
///             GetResult::NoSuchInstance
///         }
///     }
///
///     fn next(&self, after: Option<&Oid>) -> NextResult {
///         match after {
///             None => NextResult::Value(oid!(0), Value::TimeTicks(12345)),
///             Some(_) => NextResult::EndOfTable,
///         }
///     }
/// }
/// ```
pub trait InstanceHandler: Send + Sync + 'static {
    /// Read the instance at `suffix`.
    fn get(&self, suffix: &Oid) -> GetResult;

    /// Return the first instance strictly after `after`, or the very first
    /// instance when `after` is `None`.
    fn next(&self, after: Option<&Oid>) -> NextResult;

    /// Write `value` to the instance at `suffix`.
    ///
    /// Default implementation refuses (read-only handler).
    fn set(&self, _suffix: &Oid, _value: &Value) -> SetResult {
        SetResult::NotWritable
    }
}
