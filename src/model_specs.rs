//! Declarative layouts of the keyword families the converter knows about.
//!
//! A [`ModelSpec`] names one keyword and lists its cards; each card is a row
//! of up to eight named fields, each with a [`FieldDescriptor`] saying how (or
//! whether) the field scales between unit systems. Specs are collected in a
//! [`SpecRegistry`], which refuses two specs claiming the same keyword.
use itertools::Itertools;

use crate::fixed::SLOTS_PER_CARD;
use crate::kunit_error::{KError, KResult};
use crate::parsing;
use crate::units::Dim;

/// Zero-based position of a field within a block: which card, which slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SlotRef {
    pub card: usize,
    pub slot: usize,
}

impl SlotRef {
    pub const fn new(card: usize, slot: usize) -> Self {
        Self { card, slot }
    }
}

/// How a single field behaves under a change of unit system
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FieldDescriptor {
    /// Labels, IDs, integer flags and unused slots. Copied byte-for-byte.
    Ignored,

    /// A real value of the given dimension.
    Numeric(Dim),

    /// A real value with unit `dim · per^x`, where `x` is read from the field
    /// at `exponent` in the same block. Ignition & growth rate coefficients,
    /// which go as 1/(time · pressure^x), are the motivating case.
    PowerLaw { dim: Dim, per: Dim, exponent: SlotRef },
}

impl FieldDescriptor {
    /// Whether the field is parsed as a number at all
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Ignored)
    }

    /// The field's dimension. For power-law fields, the part that does not depend on the exponent.
    pub fn dim(&self) -> Option<Dim> {
        match self {
            Self::Ignored => None,
            Self::Numeric(dim) => Some(*dim),
            Self::PowerLaw { dim, .. } => Some(*dim),
        }
    }
}

/// One data line of a keyword block: up to eight named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    fields: Vec<(String, FieldDescriptor)>,
}

impl Card {
    /// Build a card from `(name, descriptor)` pairs. Slots past the end are [`FieldDescriptor::Ignored`].
    ///
    /// # Panics
    /// If more than [`SLOTS_PER_CARD`] fields are given.
    pub fn new<S: Into<String>>(fields: Vec<(S, FieldDescriptor)>) -> Self {
        assert!(fields.len() <= SLOTS_PER_CARD, "A card holds at most {SLOTS_PER_CARD} fields, got {}", fields.len());
        let fields = fields.into_iter().map(|(n, d)| (n.into(), d)).collect();
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn descriptor(&self, slot: usize) -> FieldDescriptor {
        self.fields.get(slot).map(|(_, d)| *d).unwrap_or(FieldDescriptor::Ignored)
    }

    pub fn field_name(&self, slot: usize) -> Option<&str> {
        self.fields.get(slot).map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
        self.fields.iter().map(|(n, d)| (n.as_str(), d))
    }
}

/// The layout of one keyword family.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    name: String,
    keyword: String,
    cards: Vec<Card>,
}

impl ModelSpec {
    /// Create a spec. `keyword` is normalized to upper case with a leading `*`.
    pub fn new<N: Into<String>>(name: N, keyword: &str, cards: Vec<Card>) -> Self {
        let keyword = keyword.trim().trim_start_matches('*').to_ascii_uppercase();
        Self { name: name.into(), keyword: format!("*{keyword}"), cards }
    }

    /// Short model name used for selection, e.g. `eos-jwl`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized keyword, e.g. `*EOS_JWL`
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Descriptor of a slot. Anything outside the declared layout is ignored.
    pub fn descriptor(&self, card: usize, slot: usize) -> FieldDescriptor {
        self.cards.get(card).map(|c| c.descriptor(slot)).unwrap_or(FieldDescriptor::Ignored)
    }

    pub fn field_name(&self, card: usize, slot: usize) -> Option<&str> {
        self.cards.get(card)?.field_name(slot)
    }

    /// Every slot holding a field called `name`, in card order
    pub fn field_slots(&self, name: &str) -> Vec<SlotRef> {
        self.cards.iter()
            .enumerate()
            .flat_map(|(i, c)| {
                c.iter()
                    .enumerate()
                    .filter(move |(_, (n, _))| *n == name)
                    .map(move |(j, _)| SlotRef::new(i, j))
            })
            .collect()
    }

    /// Whether any field of the spec gets rescaled
    pub fn has_numeric_fields(&self) -> bool {
        self.cards.iter().any(|c| c.iter().any(|(_, d)| d.is_numeric()))
    }
}

/// Read-only collection of model specs, looked up by keyword line or model name.
#[derive(Debug, Clone)]
pub struct SpecRegistry {
    specs: Vec<ModelSpec>,
}

impl SpecRegistry {
    /// Build a registry, failing if two specs share a keyword or a model name.
    pub fn new(specs: Vec<ModelSpec>) -> KResult<Self> {
        if let Some(kw) = specs.iter().map(|s| s.keyword.as_str()).duplicates().next() {
            return Err(KError::DuplicateKeyword(kw.to_string()));
        }
        if let Some(name) = specs.iter().map(|s| s.name.as_str()).duplicates().next() {
            return Err(KError::DuplicateModel(name.to_string()));
        }
        Ok(Self { specs })
    }

    /// Find the spec for a keyword line such as `"*EOS_JWL   "`.
    ///
    /// Matching is exact on the keyword name, ignoring ASCII case and trailing
    /// whitespace. Lines that are not keyword lines return `None`.
    pub fn lookup(&self, keyword_line: &str) -> Option<&ModelSpec> {
        let kw = parsing::keyword_name(keyword_line)?;
        self.lookup_normalized(&kw)
    }

    /// Find the spec for an already-normalized keyword (`*` plus upper case name).
    pub(crate) fn lookup_normalized(&self, keyword: &str) -> Option<&ModelSpec> {
        self.specs.iter().find(|s| s.keyword == keyword)
    }

    /// Find a spec by model name.
    pub fn get(&self, model_name: &str) -> Option<&ModelSpec> {
        self.specs.iter().find(|s| s.name == model_name)
    }

    /// All registered keywords, sorted
    pub fn list_known_keywords(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.keyword.as_str()).sorted().collect()
    }

    /// All registered model names, sorted
    pub fn list_models(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).sorted().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
