//! Convert whole decks between unit systems.
//!
//! A deck is split into [`KeywordBlock`]s, each starting at a keyword line.
//! Blocks whose keyword has a registered [`ModelSpec`] get their numeric
//! fields rescaled in place; everything else (unknown keywords, comments,
//! labels, IDs, blank slots) is copied byte-for-byte.
//!
//! ```
//! # use kunit::engine::convert_text;
//! let deck = "*MAT_NULL\n$ mid, ro, pc\n         1      1.84   -1.0E-4\n";
//! let out = convert_text(deck, "mm-mg-us", "m-kg-s", None).unwrap();
//! assert_eq!(out, "*MAT_NULL\n$ mid, ro, pc\n         1    1840.0 -100000.0\n");
//! ```
//!
//! Conversion is all-or-nothing: the first field that cannot be parsed or
//! written back aborts the call with an error naming its location.
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;

use itertools::Itertools;
use tracing::{debug, trace};

use crate::fixed::{format_field, parse_field, split_slots, FIELD_WIDTH, SLOTS_PER_CARD};
use crate::kunit_error::{FieldLocation, KError, KResult};
use crate::model_specs::{FieldDescriptor, ModelSpec, SlotRef, SpecRegistry};
use crate::models::builtin_registry;
use crate::parsing;
use crate::transforms::{self, ResolvedTransform, TransformMap};
use crate::units::{conversion_factor, conversion_factor_powf, UnitSystem};

/// First non-blank character of a comment line
pub const COMMENT_MARKER: char = '$';

/// First non-blank character of a keyword line
pub const KEYWORD_MARKER: char = '*';

/// A keyword line and the lines that follow it, up to the next keyword line.
///
/// Lines keep their terminators, so concatenating the lines of every block of
/// a deck gives back the deck. Lines before the first keyword form a block
/// with no keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordBlock<'t> {
    /// Normalized keyword (`*` plus upper case name). For keyword lines that
    /// do not parse as a bare keyword, the line itself with trailing blanks removed.
    pub keyword: Option<String>,
    pub lines: Vec<Cow<'t, str>>,
    /// 1-based line number of the first line in the deck
    pub start_line: usize,
}

impl<'t> KeywordBlock<'t> {
    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }

    /// Indices into `lines` of the lines that hold data, i.e. are neither blank, comments nor the keyword line.
    pub fn data_line_indices(&self) -> Vec<usize> {
        self.lines.iter()
            .enumerate()
            .filter(|(_, l)| is_data_line(l))
            .map(|(i, _)| i)
            .collect()
    }

    /// The block's text, terminators included
    pub fn text(&self) -> String {
        self.lines.concat()
    }
}

impl<'t> Display for KeywordBlock<'t> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in self.lines.iter() {
            write!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Split a deck into keyword blocks, keeping every byte of the input.
pub fn split_blocks(text: &str) -> Vec<KeywordBlock<'_>> {
    let mut blocks = Vec::new();
    let mut current = KeywordBlock { keyword: None, lines: Vec::new(), start_line: 1 };

    for (i, line) in text.split_inclusive('\n').enumerate() {
        if is_keyword_line(line) {
            if !current.lines.is_empty() {
                blocks.push(current);
            }
            let keyword = parsing::keyword_name(line).unwrap_or_else(|| line.trim().to_string());
            current = KeywordBlock { keyword: Some(keyword), lines: vec![Cow::Borrowed(line)], start_line: i + 1 };
        } else {
            current.lines.push(Cow::Borrowed(line));
        }
    }

    if !current.lines.is_empty() {
        blocks.push(current);
    }
    blocks
}

pub fn is_keyword_line(line: &str) -> bool {
    line.trim_start().starts_with(KEYWORD_MARKER)
}

pub fn is_comment_line(line: &str) -> bool {
    line.trim_start().starts_with(COMMENT_MARKER)
}

/// A line that fills a card: not blank, not a comment and not a keyword line.
pub fn is_data_line(line: &str) -> bool {
    !line.trim().is_empty() && !is_comment_line(line) && !is_keyword_line(line)
}

/// Converts decks from one unit system to another using a registry of model specs.
///
/// A `Converter` holds no mutable state, so one instance can be shared by
/// any number of threads.
#[derive(Debug, Clone)]
pub struct Converter<'r> {
    registry: &'r SpecRegistry,
    src: &'static UnitSystem,
    dst: &'static UnitSystem,
    selection: Option<HashSet<String>>,
    transforms: HashMap<String, HashMap<SlotRef, ResolvedTransform>>,
}

impl Converter<'static> {
    /// A converter using the built-in model specs.
    ///
    /// Fails with `KError::UnknownUnitSystem` if either name is not a built-in unit system.
    pub fn new(src: &str, dst: &str) -> KResult<Self> {
        Self::with_registry(builtin_registry(), src, dst)
    }
}

impl<'r> Converter<'r> {
    pub fn with_registry(registry: &'r SpecRegistry, src: &str, dst: &str) -> KResult<Self> {
        let src = UnitSystem::lookup(src)?;
        let dst = UnitSystem::lookup(dst)?;
        Ok(Self { registry, src, dst, selection: None, transforms: HashMap::new() })
    }

    /// Only convert blocks of the named models; other blocks are copied unchanged.
    ///
    /// Fails with `KError::UnknownModel` for a name the registry does not know.
    pub fn select_models<S: AsRef<str>>(mut self, models: &[S]) -> KResult<Self> {
        let mut selection = HashSet::with_capacity(models.len());
        for m in models {
            let m = m.as_ref().trim();
            let spec = self.registry.get(m).ok_or_else(|| KError::UnknownModel(m.to_string()))?;
            selection.insert(spec.name().to_string());
        }
        self.selection = Some(selection);
        Ok(self)
    }

    /// Apply extra per-field transforms after unit scaling, replacing any set before.
    ///
    /// Fails with `KError::UnknownModel` for a model the registry does not
    /// know and `KError::InvalidTransform` for a field the model does not have.
    pub fn with_transforms(mut self, transform_map: &TransformMap) -> KResult<Self> {
        let mut resolved: HashMap<String, HashMap<SlotRef, ResolvedTransform>> = HashMap::new();
        for (model, fields) in transform_map.iter() {
            let spec = self.registry.get(model.trim()).ok_or_else(|| KError::UnknownModel(model.to_string()))?;
            let by_slot = resolved.entry(spec.name().to_string()).or_default();
            for (field, transform) in fields.iter() {
                let (slots, t) = transforms::resolve(spec, field, transform)?;
                for slot in slots {
                    by_slot.insert(slot, t.clone());
                }
            }
        }
        self.transforms = resolved;
        Ok(self)
    }

    pub fn src(&self) -> &'static UnitSystem {
        self.src
    }

    pub fn dst(&self) -> &'static UnitSystem {
        self.dst
    }

    pub fn registry(&self) -> &'r SpecRegistry {
        self.registry
    }

    /// Convert a whole deck. Nothing is returned unless every block converts.
    pub fn convert_text(&self, text: &str) -> KResult<String> {
        let blocks = split_blocks(text);
        let mut out = String::with_capacity(text.len());
        let mut n_converted = 0;
        for block in blocks.iter() {
            let new_block = self.convert_block(block)?;
            if new_block != *block {
                n_converted += 1;
            }
            for line in new_block.lines {
                out.push_str(&line);
            }
        }

        debug!(src = %self.src, dst = %self.dst, blocks = blocks.len(), changed = n_converted, "converted deck");
        Ok(out)
    }

    /// Convert one block. Blocks without a matching (and selected) model spec come back unchanged.
    pub fn convert_block<'t>(&self, block: &KeywordBlock<'t>) -> KResult<KeywordBlock<'t>> {
        let Some(keyword) = block.keyword() else {
            return Ok(block.clone());
        };

        let Some(spec) = self.registry.lookup_normalized(keyword) else {
            debug!(keyword, line = block.start_line, "no model spec for keyword, copying block");
            return Ok(block.clone());
        };

        if let Some(selection) = &self.selection {
            if !selection.contains(spec.name()) {
                debug!(keyword, model = spec.name(), "model not selected, copying block");
                return Ok(block.clone());
            }
        }

        let data_lines = block.data_line_indices();
        if data_lines.len() < spec.card_count() {
            debug!(keyword, expected = spec.card_count(), found = data_lines.len(), "block has fewer cards than its model, converting those present");
        }

        let exponents = self.read_exponents(spec, block, &data_lines)?;

        let mut new_block = block.clone();
        for (card, &idx) in data_lines.iter().enumerate().take(spec.card_count()) {
            let line_no = block.start_line + idx;
            if let Some(new_line) = self.convert_card(spec, card, &block.lines[idx], line_no, &exponents)? {
                new_block.lines[idx] = Cow::Owned(new_line);
            }
        }
        Ok(new_block)
    }

    /// Values of every slot a power-law field or a transform takes its exponent from.
    /// Missing cards and blank slots read as `None`.
    fn read_exponents(&self, spec: &ModelSpec, block: &KeywordBlock<'_>, data_lines: &[usize]) -> KResult<HashMap<SlotRef, Option<f64>>> {
        let mut exponents = HashMap::new();
        let power_law_refs = spec.cards().iter()
            .flat_map(|c| c.iter())
            .filter_map(|(_, d)| match d {
                FieldDescriptor::PowerLaw { exponent, .. } => Some(*exponent),
                _ => None,
            });
        let transform_refs = self.transforms.get(spec.name())
            .into_iter()
            .flat_map(|m| m.values())
            .filter_map(|t| t.scale_power_slot);

        for r in power_law_refs.chain(transform_refs).unique() {
            let value = match data_lines.get(r.card) {
                Some(&idx) => {
                    let (body, _) = split_terminator(&block.lines[idx]);
                    let slots = split_slots(body);
                    let text = slots.get(r.slot).map(|s| s.as_str()).unwrap_or("");
                    if text.trim().is_empty() {
                        None
                    } else {
                        Some(parse_field(text).map_err(|e| e.at(location(spec, r.card, r.slot, block.start_line + idx)))?)
                    }
                },
                None => None,
            };
            exponents.insert(r, value);
        }
        Ok(exponents)
    }

    /// Rescale the numeric slots of one data line. Returns `None` if nothing changed.
    fn convert_card(&self, spec: &ModelSpec, card: usize, line: &str, line_no: usize, exponents: &HashMap<SlotRef, Option<f64>>) -> KResult<Option<String>> {
        let (body, terminator) = split_terminator(line);
        let mut chars: Vec<char> = body.chars().collect();
        let mut changed = false;

        for slot in 0..SLOTS_PER_CARD {
            let descriptor = spec.descriptor(card, slot);
            let transform = self.transforms.get(spec.name()).and_then(|m| m.get(&SlotRef::new(card, slot)));
            if !descriptor.is_numeric() && transform.is_none() {
                continue;
            }

            let start = slot * FIELD_WIDTH;
            if start >= chars.len() {
                break;
            }
            let end = (start + FIELD_WIDTH).min(chars.len());
            let text: String = chars[start..end].iter().collect();
            if text.trim().is_empty() {
                continue;
            }

            let loc = || location(spec, card, slot, line_no);
            let value = parse_field(&text).map_err(|e| e.at(loc()))?;
            let scaled = match transform {
                Some(t) => value * self.transform_factor(&descriptor, t, exponents),
                None => {
                    let factor = self.factor(&descriptor, exponents);
                    if factor == 1.0 {
                        continue;
                    }
                    value * factor
                },
            };
            if value != 0.0 && scaled == 0.0 {
                return Err(KError::FieldOverflow { value: scaled, location: None }.at(loc()));
            }

            let new_value = transform.map_or(scaled, |t| t.transform.finish(scaled));
            let new_text = format_field(new_value).map_err(|e| e.at(loc()))?;
            trace!(keyword = spec.keyword(), card, slot, old = text.trim(), new = new_text.trim(), "rescaled field");
            chars.splice(start..end, new_text.chars());
            changed = true;
        }

        if changed {
            let mut out: String = chars.into_iter().collect();
            out.push_str(terminator);
            Ok(Some(out))
        } else {
            Ok(None)
        }
    }

    fn factor(&self, descriptor: &FieldDescriptor, exponents: &HashMap<SlotRef, Option<f64>>) -> f64 {
        match descriptor {
            FieldDescriptor::Ignored => 1.0,
            FieldDescriptor::Numeric(dim) => conversion_factor(*dim, self.src, self.dst),
            FieldDescriptor::PowerLaw { dim, per, exponent } => {
                let x = exponents.get(exponent).copied().flatten().unwrap_or(0.0);
                conversion_factor(*dim, self.src, self.dst) * conversion_factor_powf(*per, self.src, self.dst, x)
            },
        }
    }

    /// Unit factor of a field that has a transform attached
    fn transform_factor(&self, descriptor: &FieldDescriptor, t: &ResolvedTransform, exponents: &HashMap<SlotRef, Option<f64>>) -> f64 {
        if t.transform.has_custom_scaling() {
            let Some(scale_dim) = t.scale_dim.or(t.transform.dim).or_else(|| descriptor.dim()) else {
                return 1.0;
            };
            let x = t.scale_power_slot
                .and_then(|r| exponents.get(&r).copied().flatten())
                .or(t.transform.scale_power)
                .unwrap_or(1.0);
            conversion_factor_powf(scale_dim, self.src, self.dst, x)
        } else if let Some(dim) = t.transform.dim {
            conversion_factor(dim, self.src, self.dst)
        } else {
            self.factor(descriptor, exponents)
        }
    }
}

fn location(spec: &ModelSpec, card: usize, slot: usize, line: usize) -> FieldLocation {
    FieldLocation {
        keyword: spec.keyword().to_string(),
        card,
        slot,
        line,
        field: spec.field_name(card, slot).map(|s| s.to_string()),
    }
}

/// Split a line into its content and its terminator (`"\r\n"`, `"\n"` or nothing).
pub(crate) fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, &line[body.len()..])
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, &line[body.len()..])
    } else {
        (line, "")
    }
}

/// Convert a deck between two built-in unit systems.
///
/// `selected_models` restricts conversion to the named models; `None` converts
/// every block with a built-in model spec.
pub fn convert_text(text: &str, src: &str, dst: &str, selected_models: Option<&[&str]>) -> KResult<String> {
    let mut converter = Converter::new(src, dst)?;
    if let Some(models) = selected_models {
        converter = converter.select_models(models)?;
    }
    converter.convert_text(text)
}

/// Convert a single block between two built-in unit systems.
pub fn convert_block<'t>(block: &KeywordBlock<'t>, src: &str, dst: &str) -> KResult<KeywordBlock<'t>> {
    Converter::new(src, dst)?.convert_block(block)
}

/// Parse a model selection such as `"all"` or `"mat-jc, eos-jwl"`.
///
/// `"all"` (any case), an empty string and a list with no names in it (`","`)
/// mean no restriction and give `None`.
pub fn parse_model_list(s: &str) -> Option<Vec<String>> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("all") {
        return None;
    }

    let names: Vec<String> = s.split(',')
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .map(|m| m.to_string())
        .collect();

    if names.is_empty() { None } else { Some(names) }
}

/// Names of the built-in models whose keywords occur in a deck, in order of first appearance.
pub fn detect_models(text: &str) -> Vec<&'static str> {
    detect_models_in(builtin_registry(), text)
}

/// Like [`detect_models`], for any registry.
pub fn detect_models_in<'r>(registry: &'r SpecRegistry, text: &str) -> Vec<&'r str> {
    split_blocks(text).iter()
        .filter_map(|b| b.keyword())
        .filter_map(|kw| registry.lookup_normalized(kw))
        .map(|spec| spec.name())
        .unique()
        .collect()
}
