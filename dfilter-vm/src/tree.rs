//! The per-packet field tree the dissector hands to the evaluator.

use std::collections::HashMap;

use dfilter_types::Value;

use crate::registry::FieldId;

/// Every field occurrence extracted from one packet, keyed by field id and
/// kept in encounter order. A protocol node with no payload still counts as
/// present for existence tests.
#[derive(Debug, Default)]
pub struct FieldTree {
    occurrences: HashMap<FieldId, Vec<Value>>,
}

impl FieldTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of a field.
    pub fn add(&mut self, field: FieldId, value: Value) {
        self.occurrences.entry(field).or_default().push(value);
    }

    /// Record a field's presence without a value (protocol nodes).
    pub fn add_present(&mut self, field: FieldId) {
        self.occurrences.entry(field).or_default();
    }

    /// Whether the field (or protocol) appears in this packet at all.
    pub fn has_field(&self, field: FieldId) -> bool {
        self.occurrences.contains_key(&field)
    }

    /// All occurrences of the field, in encounter order.
    pub fn values(&self, field: FieldId) -> Option<&[Value]> {
        self.occurrences.get(&field).map(Vec::as_slice)
    }
}
