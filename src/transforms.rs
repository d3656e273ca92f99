//! Per-field adjustments applied on top of unit scaling.
//!
//! A [`FieldTransform`] is attached to a field of one model. Once the field
//! has been rescaled, its value becomes `value^power * multiplier + offset`.
//! A transform can also change how the field is rescaled:
//!
//! - `dim` scales it as a different dimension than its model spec says;
//! - `scale_dim` (or the dimension of the field named by `scale_dim_field`)
//!   raised to an exponent replaces the unit factor entirely. The exponent
//!   is read from the field named by `scale_power_field` in the same block,
//!   falling back to `scale_power` and then to 1.
//!
//! ```
//! # use std::collections::HashMap;
//! # use kunit::engine::Converter;
//! # use kunit::transforms::FieldTransform;
//! // Write MAT_NULL densities in SI, then as specific gravity relative to water
//! let to_sg = FieldTransform { multiplier: 1e-3, ..Default::default() };
//! let transforms = HashMap::from([
//!     ("mat-null".to_string(), HashMap::from([("ro".to_string(), to_sg)])),
//! ]);
//! let conv = Converter::new("mm-mg-us", "m-kg-s").unwrap().with_transforms(&transforms).unwrap();
//! assert_eq!(conv.convert_text("*MAT_NULL\n         1      1.84\n").unwrap(), "*MAT_NULL\n         1      1.84\n");
//! ```
use std::collections::HashMap;

use crate::kunit_error::{KError, KResult};
use crate::model_specs::{ModelSpec, SlotRef};
use crate::units::Dim;

/// Transforms keyed by model name, then by field name
pub type TransformMap = HashMap<String, HashMap<String, FieldTransform>>;

/// Extra scaling and a polynomial touch-up for one field
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FieldTransform {
    pub power: f64,
    pub multiplier: f64,
    pub offset: f64,

    /// Rescale with this dimension instead of the one in the model spec.
    pub dim: Option<Dim>,

    /// Dimension whose conversion factor, raised to the scale exponent, rescales the field.
    pub scale_dim: Option<Dim>,

    /// Use the dimension of this other field of the model as `scale_dim`.
    pub scale_dim_field: Option<String>,

    /// Read the scale exponent from this other field of the same block.
    pub scale_power_field: Option<String>,

    /// Scale exponent when `scale_power_field` is unset or blank.
    pub scale_power: Option<f64>,
}

impl Default for FieldTransform {
    fn default() -> Self {
        Self {
            power: 1.0,
            multiplier: 1.0,
            offset: 0.0,
            dim: None,
            scale_dim: None,
            scale_dim_field: None,
            scale_power_field: None,
            scale_power: None,
        }
    }
}

impl FieldTransform {
    /// Whether the transform replaces the unit factor of the field
    pub fn has_custom_scaling(&self) -> bool {
        self.scale_dim.is_some()
            || self.scale_dim_field.is_some()
            || self.scale_power_field.is_some()
            || self.scale_power.is_some()
    }

    /// `value^power * multiplier + offset`, applied to an already rescaled value
    pub fn finish(&self, value: f64) -> f64 {
        let v = if self.power == 1.0 { value } else { value.powf(self.power) };
        v * self.multiplier + self.offset
    }
}

/// A transform checked against its model spec, with field names replaced by slots
#[derive(Debug, Clone)]
pub(crate) struct ResolvedTransform {
    pub(crate) transform: FieldTransform,
    pub(crate) scale_dim: Option<Dim>,
    pub(crate) scale_power_slot: Option<SlotRef>,
}

/// Check the transform for `field` against `spec`. Returns the slots it applies to.
pub(crate) fn resolve(spec: &ModelSpec, field: &str, transform: &FieldTransform) -> KResult<(Vec<SlotRef>, ResolvedTransform)> {
    let invalid = |reason: String| KError::InvalidTransform {
        model: spec.name().to_string(),
        field: field.to_string(),
        reason,
    };

    let slots = spec.field_slots(field);
    if slots.is_empty() {
        return Err(invalid(format!("{} has no field '{field}'", spec.keyword())));
    }

    let scale_dim = match (&transform.scale_dim, &transform.scale_dim_field) {
        (Some(dim), _) => Some(*dim),
        (None, Some(other)) => {
            let slot = spec.field_slots(other).first().copied()
                .ok_or_else(|| invalid(format!("scale_dim_field '{other}' is not a field of {}", spec.keyword())))?;
            let dim = spec.descriptor(slot.card, slot.slot).dim()
                .ok_or_else(|| invalid(format!("scale_dim_field '{other}' has no dimension")))?;
            Some(dim)
        },
        (None, None) => None,
    };

    let scale_power_slot = match &transform.scale_power_field {
        Some(other) => Some(
            spec.field_slots(other).first().copied()
                .ok_or_else(|| invalid(format!("scale_power_field '{other}' is not a field of {}", spec.keyword())))?
        ),
        None => None,
    };

    Ok((slots, ResolvedTransform { transform: transform.clone(), scale_dim, scale_power_slot }))
}
