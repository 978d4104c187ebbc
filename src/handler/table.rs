//! Ready-made handlers: scalars and sorted suffix tables.

use std::sync::RwLock;

use crate::oid::Oid;
use crate::value::Value;

use super::{GetResult, InstanceHandler, NextResult, SetResult};

/// Sorted suffix-to-value storage for table handlers.
///
/// Keeps entries ordered so the successor query of a GETNEXT walk is a
/// binary search.
#[derive(Debug, Clone, Default)]
pub struct SuffixTable<V> {
    entries: Vec<(Oid, V)>,
}

impl<V> SuffixTable<V> {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert a suffix-value pair, maintaining sorted order.
    ///
    /// If the suffix already exists, its value is replaced.
    pub fn insert(&mut self, suffix: Oid, value: V) {
        match self.entries.binary_search_by(|(o, _)| o.cmp(&suffix)) {
            Ok(idx) => self.entries[idx].1 = value,
            Err(idx) => self.entries.insert(idx, (suffix, value)),
        }
    }

    /// Remove a suffix, returning its value if present.
    pub fn remove(&mut self, suffix: &Oid) -> Option<V> {
        match self.entries.binary_search_by(|(o, _)| o.cmp(suffix)) {
            Ok(idx) => Some(self.entries.remove(idx).1),
            Err(_) => None,
        }
    }

    /// Exact lookup.
    pub fn get(&self, suffix: &Oid) -> Option<&V> {
        match self.entries.binary_search_by(|(o, _)| o.cmp(suffix)) {
            Ok(idx) => Some(&self.entries[idx].1),
            Err(_) => None,
        }
    }

    /// Mutable exact lookup.
    pub fn get_mut(&mut self, suffix: &Oid) -> Option<&mut V> {
        match self.entries.binary_search_by(|(o, _)| o.cmp(suffix)) {
            Ok(idx) => Some(&mut self.entries[idx].1),
            Err(_) => None,
        }
    }

    /// The least entry strictly greater than `suffix`, or the first entry
    /// when `suffix` is `None`.
    pub fn next_after(&self, suffix: Option<&Oid>) -> Option<(&Oid, &V)> {
        let idx = match suffix {
            None => 0,
            Some(suffix) => match self.entries.binary_search_by(|(o, _)| o.cmp(suffix)) {
                Ok(idx) => idx + 1,
                Err(idx) => idx,
            },
        };
        self.entries.get(idx).map(|(o, v)| (o, v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in lexicographic suffix order.
    pub fn iter(&self) -> impl Iterator<Item = (&Oid, &V)> {
        self.entries.iter().map(|(o, v)| (o, v))
    }
}

/// A read-only or writable scalar instance (`.0` suffix).
///
/// # Example
///
/// ```rust
/// use smithsnmp::handler::ScalarHandler;
/// use smithsnmp::Value;
///
/// let sys_descr = ScalarHandler::read_only(|| Value::from("SmithSNMP"));
/// ```
pub struct ScalarHandler<R, W = fn(&Value) -> SetResult>
where
    R: Fn() -> Value + Send + Sync + 'static,
    W: Fn(&Value) -> SetResult + Send + Sync + 'static,
{
    read: R,
    write: Option<W>,
}

impl<R> ScalarHandler<R>
where
    R: Fn() -> Value + Send + Sync + 'static,
{
    /// A scalar that refuses writes.
    pub fn read_only(read: R) -> Self {
        Self { read, write: None }
    }
}

impl<R, W> ScalarHandler<R, W>
where
    R: Fn() -> Value + Send + Sync + 'static,
    W: Fn(&Value) -> SetResult + Send + Sync + 'static,
{
    /// A scalar with a write hook deciding SET outcomes.
    pub fn read_write(read: R, write: W) -> Self {
        Self {
            read,
            write: Some(write),
        }
    }
}

impl<R, W> InstanceHandler for ScalarHandler<R, W>
where
    R: Fn() -> Value + Send + Sync + 'static,
    W: Fn(&Value) -> SetResult + Send + Sync + 'static,
{
    fn get(&self, suffix: &Oid) -> GetResult {
        if suffix.arcs() == [0] {
            GetResult::Value((self.read)())
        } else {
            GetResult::NoSuchInstance
        }
    }

    fn next(&self, after: Option<&Oid>) -> NextResult {
        let zero = Oid::from_slice(&[0]);
        match after {
            Some(suffix) if *suffix >= zero => NextResult::EndOfTable,
            _ => NextResult::Value(zero, (self.read)()),
        }
    }

    fn set(&self, suffix: &Oid, value: &Value) -> SetResult {
        if suffix.arcs() != [0] {
            return SetResult::NoSuchInstance;
        }
        match &self.write {
            Some(write) => write(value),
            None => SetResult::NotWritable,
        }
    }
}

/// A table column (or whole conceptual table) backed by a [`SuffixTable`].
///
/// Rows are inserted up front or mutated through SET when marked writable.
/// The engine's GETBULK row-major traversal falls out of the sorted order.
pub struct TableHandler {
    cells: RwLock<SuffixTable<Value>>,
    writable: bool,
}

impl TableHandler {
    /// Build a read-only table from (suffix, value) rows.
    pub fn read_only(rows: impl IntoIterator<Item = (Oid, Value)>) -> Self {
        Self::build(rows, false)
    }

    /// Build a table whose existing cells accept same-type SETs.
    pub fn read_write(rows: impl IntoIterator<Item = (Oid, Value)>) -> Self {
        Self::build(rows, true)
    }

    fn build(rows: impl IntoIterator<Item = (Oid, Value)>, writable: bool) -> Self {
        let mut cells = SuffixTable::new();
        for (suffix, value) in rows {
            cells.insert(suffix, value);
        }
        Self {
            cells: RwLock::new(cells),
            writable,
        }
    }
}

impl InstanceHandler for TableHandler {
    fn get(&self, suffix: &Oid) -> GetResult {
        let cells = self.cells.read().expect("suffix table lock");
        match cells.get(suffix) {
            Some(value) => GetResult::Value(value.clone()),
            None => GetResult::NoSuchInstance,
        }
    }

    fn next(&self, after: Option<&Oid>) -> NextResult {
        let cells = self.cells.read().expect("suffix table lock");
        match cells.next_after(after) {
            Some((suffix, value)) => NextResult::Value(suffix.clone(), value.clone()),
            None => NextResult::EndOfTable,
        }
    }

    fn set(&self, suffix: &Oid, value: &Value) -> SetResult {
        if !self.writable {
            return SetResult::NotWritable;
        }
        let mut cells = self.cells.write().expect("suffix table lock");
        match cells.get_mut(suffix) {
            Some(cell) => {
                if cell.tag() != value.tag() {
                    return SetResult::WrongType;
                }
                *cell = value.clone();
                SetResult::Ok
            }
            // No row creation through SET
            None => SetResult::NoCreation,
        }
    }
}
