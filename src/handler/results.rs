//! Result types for instance handler operations.

use crate::error::ErrorStatus;
use crate::oid::Oid;
use crate::value::Value;

/// Result of a GET on one instance.
#[derive(Debug, Clone, PartialEq)]
pub enum GetResult {
    /// The instance exists and has this value.
    Value(Value),
    /// The handler's object exists but this instance does not
    /// (wrong suffix, missing table row).
    NoSuchInstance,
}

impl From<Value> for GetResult {
    fn from(value: Value) -> Self {
        GetResult::Value(value)
    }
}

/// Result of a successor query on one handler.
#[derive(Debug, Clone, PartialEq)]
pub enum NextResult {
    /// The next instance: its suffix (relative to the handler's registered
    /// prefix) and value.
    Value(Oid, Value),
    /// No instance follows; the walk moves past this handler.
    EndOfTable,
}

impl NextResult {
    /// Returns `true` if this is a value result.
    pub fn is_value(&self) -> bool {
        matches!(self, NextResult::Value(..))
    }
}

/// Result of a SET on one instance.
///
/// The variants map to RFC 3416 error status codes. The engine converts
/// anything but `Ok` into the PDU error status; handlers that simply do not
/// support writes return [`SetResult::NotWritable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetResult {
    /// Write applied.
    Ok,
    /// Object is inherently read-only.
    NotWritable,
    /// Value has wrong ASN.1 type for this instance.
    WrongType,
    /// Value has wrong length for this instance.
    WrongLength,
    /// Value encoding is incorrect.
    WrongEncoding,
    /// Value is not valid for this instance.
    WrongValue,
    /// Cannot create a new row at this suffix.
    NoCreation,
    /// Value is inconsistent with other managed state.
    InconsistentValue,
    /// Resource unavailable while applying the write.
    ResourceUnavailable,
    /// Internal failure while applying the write.
    CommitFailed,
    /// The instance does not exist (maps to the notWritable status, since
    /// SNMPv2 SET has no exception values).
    NoSuchInstance,
}

impl SetResult {
    /// Check if this result indicates success.
    pub fn is_ok(&self) -> bool {
        matches!(self, SetResult::Ok)
    }

    /// Convert to an ErrorStatus code.
    pub fn to_error_status(&self) -> ErrorStatus {
        match self {
            SetResult::Ok => ErrorStatus::NoError,
            SetResult::NotWritable => ErrorStatus::NotWritable,
            SetResult::WrongType => ErrorStatus::WrongType,
            SetResult::WrongLength => ErrorStatus::WrongLength,
            SetResult::WrongEncoding => ErrorStatus::WrongEncoding,
            SetResult::WrongValue => ErrorStatus::WrongValue,
            SetResult::NoCreation => ErrorStatus::NoCreation,
            SetResult::InconsistentValue => ErrorStatus::InconsistentValue,
            SetResult::ResourceUnavailable => ErrorStatus::ResourceUnavailable,
            SetResult::CommitFailed => ErrorStatus::CommitFailed,
            SetResult::NoSuchInstance => ErrorStatus::NotWritable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_result_to_error_status() {
        assert_eq!(SetResult::Ok.to_error_status(), ErrorStatus::NoError);
        assert_eq!(
            SetResult::NotWritable.to_error_status(),
            ErrorStatus::NotWritable
        );
        assert_eq!(
            SetResult::WrongType.to_error_status(),
            ErrorStatus::WrongType
        );
        assert_eq!(
            SetResult::NoSuchInstance.to_error_status(),
            ErrorStatus::NotWritable
        );
    }

    #[test]
    fn test_set_result_is_ok() {
        assert!(SetResult::Ok.is_ok());
        assert!(!SetResult::CommitFailed.is_ok());
    }

    #[test]
    fn test_next_result_is_value() {
        assert!(NextResult::Value(crate::oid!(1, 0), Value::Integer(1)).is_value());
        assert!(!NextResult::EndOfTable.is_value());
    }
}
