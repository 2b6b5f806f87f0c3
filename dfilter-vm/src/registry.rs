//! Field descriptors and the registry that resolves dotted names.

use std::collections::HashMap;

use bitflags::bitflags;
use dfilter_types::FType;

/// Identifier of a registered field.
pub type FieldId = usize;

bitflags! {
    /// Display-hint flags attached to a field registration. They select the
    /// lookup strategy used when a literal has to be resolved through the
    /// field's value-string table.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DisplayHint: u32 {
        const RANGE_STRING = 0x0001;
        const VAL64_STRING = 0x0002;
        const EXT_STRING   = 0x0004;
        const CUSTOM       = 0x0008;
    }
}

/// Per-field mapping from textual enumerators to the values they name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueStrings {
    /// Strings for boolean fields, e.g. `("Set", "Not set")`.
    TrueFalse { true_string: String, false_string: String },
    /// 32-bit value strings.
    Values(Vec<(u32, String)>),
    /// 64-bit value strings, selected by [`DisplayHint::VAL64_STRING`].
    Values64(Vec<(u64, String)>),
}

/// A registered field descriptor.
///
/// Several descriptors may share a dotted name but differ in type; they are
/// linked into an alias chain through `same_name_prev` / `same_name_next`,
/// ordered by registration.
#[derive(Debug, Clone)]
pub struct HField {
    pub id: FieldId,
    pub abbrev: String,
    pub ftype: FType,
    pub display: DisplayHint,
    pub strings: Option<ValueStrings>,
    pub same_name_prev: Option<FieldId>,
    pub same_name_next: Option<FieldId>,
}

/// The registry of every field the dissector knows about.
///
/// Name lookup returns the newest registration for a dotted name; the
/// semantic checker walks `same_name_prev` from there to find an alias whose
/// type suits a literal, and the code generator anchors field loads on the
/// chain head so evaluation sees every alias.
#[derive(Debug, Default)]
pub struct FieldRegistry {
    fields: Vec<HField>,
    by_name: HashMap<String, FieldId>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, abbrev: &str, ftype: FType) -> FieldId {
        self.register_full(abbrev, ftype, DisplayHint::empty(), None)
    }

    pub fn register_full(
        &mut self,
        abbrev: &str,
        ftype: FType,
        display: DisplayHint,
        strings: Option<ValueStrings>,
    ) -> FieldId {
        let id = self.fields.len();
        let same_name_prev = self.by_name.get(abbrev).copied();
        if let Some(prev) = same_name_prev {
            self.fields[prev].same_name_next = Some(id);
        }
        self.fields.push(HField {
            id,
            abbrev: abbrev.to_owned(),
            ftype,
            display,
            strings,
            same_name_prev,
            same_name_next: None,
        });
        self.by_name.insert(abbrev.to_owned(), id);
        id
    }

    /// Resolve a dotted name to its newest registration.
    pub fn lookup(&self, abbrev: &str) -> Option<&HField> {
        self.by_name.get(abbrev).map(|&id| &self.fields[id])
    }

    /// Descriptor by id. Ids held by compiled programs always resolve.
    pub fn field(&self, id: FieldId) -> &HField {
        &self.fields[id]
    }

    /// The oldest registration sharing `id`'s dotted name.
    pub fn chain_head(&self, id: FieldId) -> FieldId {
        let mut id = id;
        while let Some(prev) = self.fields[id].same_name_prev {
            id = prev;
        }
        id
    }

    /// Iterate the alias chain from `id` towards newer registrations.
    pub fn alias_chain(&self, id: FieldId) -> AliasChain<'_> {
        AliasChain { registry: self, next: Some(id) }
    }
}

/// Iterator over an alias chain, following `same_name_next`.
pub struct AliasChain<'r> {
    registry: &'r FieldRegistry,
    next: Option<FieldId>,
}

impl<'r> Iterator for AliasChain<'r> {
    type Item = &'r HField;

    fn next(&mut self) -> Option<Self::Item> {
        let hf = &self.registry.fields[self.next?];
        self.next = hf.same_name_next;
        Some(hf)
    }
}
