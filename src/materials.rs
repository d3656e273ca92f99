//! Material records: ready-made keyword blocks kept with the unit system they
//! were written in, exported or converted together into one deck.
//!
//! A [`MaterialRecord`] holds one material section and, optionally, an
//! equation-of-state section. On output each record gets a new 1-based
//! identifier: every `mid` and `eosid` field of its blocks is rewritten to
//! the record's position in the list, so a material and its equation of
//! state stay paired however the records were numbered when stored.
//!
//! ```
//! # use kunit::materials::{export_materials, MaterialRecord, MaterialSection, SectionKind};
//! let air = MaterialSection::new(SectionKind::Material, "mat-null", "mm-mg-us", "*MAT_NULL\n        12   1.29E-6\n").unwrap();
//! let record = MaterialRecord::new("air", "Air", vec![air], &[] as &[&str]).unwrap();
//! assert_eq!(export_materials(&[record]).unwrap(), "*MAT_NULL\n         1   1.29E-6\n");
//! ```
use std::borrow::Cow;
use std::fmt::Display;

use itertools::Itertools;
use tracing::debug;

use crate::engine::{detect_models, split_blocks, split_terminator, Converter};
use crate::fixed::replace_slot;
use crate::kunit_error::{KError, KResult};
use crate::models::builtin_registry;
use crate::units::UnitSystem;

/// Fields holding the identifier of a material or an equation of state
pub const IDENTIFIER_FIELDS: [&str; 2] = ["mid", "eosid"];

/// What a section of a material record describes. Material sections are written first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SectionKind {
    Material,
    Eos,
}

impl Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionKind::Material => write!(f, "material"),
            SectionKind::Eos => write!(f, "eos"),
        }
    }
}

/// Keyword text of one model, in its own unit system
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MaterialSection {
    kind: SectionKind,
    model: String,
    units: String,
    payload: String,
}

impl MaterialSection {
    /// Fails with `UnknownModel` or `UnknownUnitSystem` for names that are not built in.
    pub fn new<P: Into<String>>(kind: SectionKind, model: &str, units: &str, payload: P) -> KResult<Self> {
        let model = builtin_registry()
            .get(model.trim())
            .ok_or_else(|| KError::UnknownModel(model.to_string()))?
            .name()
            .to_string();
        let units = UnitSystem::lookup(units)?.name().to_string();
        Ok(Self { kind, model, units, payload: payload.into() })
    }

    pub fn kind(&self) -> SectionKind {
        self.kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The payload, ending with a newline
    pub fn to_k(&self) -> String {
        let mut text = self.payload.clone();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        text
    }
}

/// A stored material: its sections plus descriptive metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MaterialRecord {
    id: String,
    name: String,
    models: Vec<String>,
    sections: Vec<MaterialSection>,
    pub reference: Option<String>,
    pub comment: Option<String>,
    pub tags: Vec<String>,
}

impl MaterialRecord {
    /// Build a record. Sections are reordered so material sections come first.
    ///
    /// `models` names the models converted with the record; an empty list
    /// means the first section's model. Models whose keywords appear in the
    /// payloads are added after those given, and the first section's model
    /// is always part of the list, in front.
    pub fn new<S: AsRef<str>>(id: &str, name: &str, mut sections: Vec<MaterialSection>, models: &[S]) -> KResult<Self> {
        let invalid = |reason: String| KError::InvalidMaterial { id: id.to_string(), reason };

        if id.trim().is_empty() {
            return Err(invalid("the identifier is empty".to_string()));
        }
        sections.sort_by_key(|s| s.kind);
        let Some(primary) = sections.first().map(|s| s.model.clone()) else {
            return Err(invalid("there are no sections".to_string()));
        };
        if let Some(s) = sections.iter().find(|s| s.payload.trim().is_empty()) {
            return Err(invalid(format!("the {} section ({}) has no keyword text", s.kind, s.model)));
        }

        let registry = builtin_registry();
        let mut names = Vec::with_capacity(models.len() + 1);
        for m in models {
            let m = m.as_ref().trim();
            let spec = registry.get(m).ok_or_else(|| KError::UnknownModel(m.to_string()))?;
            names.push(spec.name().to_string());
        }
        if names.is_empty() {
            names.push(primary.clone());
        }

        let text: String = sections.iter().map(|s| s.to_k()).collect();
        names.extend(detect_models(&text).into_iter().map(|m| m.to_string()));
        let mut names: Vec<String> = names.into_iter().filter(|n| *n != primary).unique().collect();
        names.insert(0, primary);

        Ok(Self {
            id: id.trim().to_string(),
            name: name.trim().to_string(),
            models: names,
            sections,
            reference: None,
            comment: None,
            tags: Vec::new(),
        })
    }

    pub fn with_reference<R: Into<String>>(mut self, reference: R) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_comment<C: Into<String>>(mut self, comment: C) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the tags, trimmed, dropping empty ones. For a comma-separated
    /// string, pass `tags.split(',')`.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags.into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Models converted with this record, primary model first
    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn sections(&self) -> &[MaterialSection] {
        &self.sections
    }

    /// The material section, or the first section if there is none.
    pub fn material(&self) -> &MaterialSection {
        self.sections.iter()
            .find(|s| s.kind == SectionKind::Material)
            .unwrap_or(&self.sections[0])
    }

    pub fn eos(&self) -> Option<&MaterialSection> {
        self.sections.iter().find(|s| s.kind == SectionKind::Eos)
    }

    /// Unit system of the material section
    pub fn units(&self) -> &str {
        self.material().units()
    }

    /// All sections as one piece of deck text, as stored
    pub fn to_k(&self) -> String {
        self.sections.iter().map(|s| s.to_k()).collect()
    }

    /// Models whose blocks get their identifier fields renumbered
    fn identifier_models(&self) -> Vec<&str> {
        self.sections.iter()
            .map(|s| s.model.as_str())
            .chain(self.models.iter().map(|m| m.as_str()))
            .unique()
            .collect()
    }
}

/// Concatenate the records as stored, renumbering their identifiers from 1.
pub fn export_materials(materials: &[MaterialRecord]) -> KResult<String> {
    let mut out = String::new();
    for (i, m) in materials.iter().enumerate() {
        out.push_str(&rewrite_identifiers(&m.to_k(), &m.identifier_models(), i + 1)?);
    }
    Ok(out)
}

/// Convert every record to `dst` and concatenate them, renumbering their identifiers from 1.
///
/// Each section is converted from its own unit system, limited to the
/// record's models. Nothing is returned unless every record converts.
pub fn convert_materials(materials: &[MaterialRecord], dst: &str) -> KResult<String> {
    let mut out = String::new();
    for (i, m) in materials.iter().enumerate() {
        let mut text = String::new();
        for section in m.sections.iter() {
            let converter = Converter::new(section.units(), dst)?.select_models(m.models())?;
            text.push_str(&converter.convert_text(&section.to_k())?);
        }
        debug!(material = m.id(), units = m.units(), dst, new_id = i + 1, "converted material");
        out.push_str(&rewrite_identifiers(&text, &m.identifier_models(), i + 1)?);
    }
    Ok(out)
}

/// Set the identifier fields of every block of `models` in `text` to `new_id`.
fn rewrite_identifiers(text: &str, models: &[&str], new_id: usize) -> KResult<String> {
    let registry = builtin_registry();
    let id_text = new_id.to_string();
    let mut out = String::with_capacity(text.len());

    for mut block in split_blocks(text) {
        let spec = block.keyword()
            .and_then(|kw| registry.lookup_normalized(kw))
            .filter(|spec| models.contains(&spec.name()));

        if let Some(spec) = spec {
            let data_lines = block.data_line_indices();
            for slot in IDENTIFIER_FIELDS.iter().flat_map(|f| spec.field_slots(f)) {
                let Some(&idx) = data_lines.get(slot.card) else {
                    continue;
                };
                let (body, terminator) = split_terminator(&block.lines[idx]);
                let new_body = replace_slot(body, slot.slot, &id_text)
                    .ok_or(KError::FieldOverflow { value: new_id as f64, location: None })?;
                let new_line = format!("{new_body}{terminator}");
                block.lines[idx] = Cow::Owned(new_line);
            }
        }

        for line in block.lines {
            out.push_str(&line);
        }
    }
    Ok(out)
}
