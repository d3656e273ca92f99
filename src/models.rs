//! The built-in keyword families.
//!
//! Fields not given a dimension here (relative volumes, exponents, Poisson's
//! ratios, temperatures, fractions) are still parsed as numbers but never
//! rescaled. Heat capacities are treated as energy per mass; temperature is
//! not a base dimension, so it is left alone.
use once_cell::sync::Lazy;

use crate::model_specs::{Card, FieldDescriptor, ModelSpec, SlotRef, SpecRegistry};
use crate::units::Dim;

use FieldDescriptor::{Ignored, Numeric};

const X: FieldDescriptor = Numeric(Dim::DIMENSIONLESS);
const PRESSURE: FieldDescriptor = Numeric(Dim::PRESSURE);
const DENSITY: FieldDescriptor = Numeric(Dim::DENSITY);
const VELOCITY: FieldDescriptor = Numeric(Dim::VELOCITY);
const RATE: FieldDescriptor = Numeric(Dim::RATE);
const SPECIFIC_ENERGY: FieldDescriptor = Numeric(Dim::SPECIFIC_ENERGY);

static BUILTIN: Lazy<SpecRegistry> = Lazy::new(|| {
    SpecRegistry::new(all_specs()).expect("built-in model specs must have unique keywords and names")
});

/// The registry holding every built-in model spec.
pub fn builtin_registry() -> &'static SpecRegistry {
    &BUILTIN
}

/// Fresh copies of every built-in model spec, e.g. to extend a custom registry.
pub fn all_specs() -> Vec<ModelSpec> {
    vec![
        mat_elastic(),
        mat_plastic_kinematic(),
        mat_johnson_cook(),
        mat_null(),
        mat_high_explosive_burn(),
        eos_linear_polynomial(),
        eos_gruneisen(),
        eos_jwl(),
        eos_jwlb(),
        eos_ignition_growth(),
    ]
}

pub fn mat_elastic() -> ModelSpec {
    ModelSpec::new("mat-elastic", "*MAT_ELASTIC", vec![
        Card::new(vec![("mid", Ignored), ("ro", DENSITY), ("e", PRESSURE), ("pr", X), ("da", X), ("db", X), ("k", PRESSURE)]),
    ])
}

pub fn mat_plastic_kinematic() -> ModelSpec {
    ModelSpec::new("mat-plastic-kinematic", "*MAT_PLASTIC_KINEMATIC", vec![
        Card::new(vec![("mid", Ignored), ("ro", DENSITY), ("e", PRESSURE), ("pr", X), ("sigy", PRESSURE), ("etan", PRESSURE), ("beta", X)]),
        Card::new(vec![("src", RATE), ("srp", X), ("fs", X), ("vp", Ignored)]),
    ])
}

/// `*MAT_JOHNSON_COOK` (MAT_015)
pub fn mat_johnson_cook() -> ModelSpec {
    ModelSpec::new("mat-jc", "*MAT_JOHNSON_COOK", vec![
        Card::new(vec![("mid", Ignored), ("ro", DENSITY), ("g", PRESSURE), ("e", PRESSURE), ("pr", X), ("dtf", Numeric(Dim::TIME)), ("vp", Ignored), ("rateop", Ignored)]),
        Card::new(vec![("a", PRESSURE), ("b", PRESSURE), ("n", X), ("c", X), ("m", X), ("tm", X), ("tr", X), ("epso", RATE)]),
        Card::new(vec![("cp", SPECIFIC_ENERGY), ("pc", PRESSURE), ("spall", Ignored), ("it", Ignored), ("d1", X), ("d2", X), ("d3", X), ("d4", X)]),
        Card::new(vec![("d5", X), ("c2/p/xnp", X), ("erod", Ignored), ("efmin", X), ("numint", Ignored), ("_", Ignored), ("_", Ignored), ("dmodel", Ignored)]),
    ])
}

pub fn mat_null() -> ModelSpec {
    ModelSpec::new("mat-null", "*MAT_NULL", vec![
        Card::new(vec![("mid", Ignored), ("ro", DENSITY), ("pc", PRESSURE), ("mu", Numeric(Dim::VISCOSITY)), ("terod", X), ("cerod", X), ("ym", PRESSURE), ("pr", X)]),
    ])
}

pub fn mat_high_explosive_burn() -> ModelSpec {
    ModelSpec::new("mat-he-burn", "*MAT_HIGH_EXPLOSIVE_BURN", vec![
        Card::new(vec![("mid", Ignored), ("ro", DENSITY), ("d", VELOCITY), ("pcj", PRESSURE), ("beta", X), ("k", PRESSURE), ("g", PRESSURE), ("sigy", PRESSURE)]),
    ])
}

pub fn eos_linear_polynomial() -> ModelSpec {
    ModelSpec::new("eos-linear-polynomial", "*EOS_LINEAR_POLYNOMIAL", vec![
        Card::new(vec![("eosid", Ignored), ("c0", PRESSURE), ("c1", PRESSURE), ("c2", PRESSURE), ("c3", PRESSURE), ("c4", X), ("c5", X), ("c6", X)]),
        Card::new(vec![("e0", PRESSURE), ("v0", X)]),
    ])
}

/// `*EOS_GRUNEISEN`. The second card leaves its second column empty.
pub fn eos_gruneisen() -> ModelSpec {
    ModelSpec::new("eos-gruneisen", "*EOS_GRUNEISEN", vec![
        Card::new(vec![("eosid", Ignored), ("c", VELOCITY), ("s1", X), ("s2", X), ("s3", X), ("gamma0", X), ("a", X), ("e0", PRESSURE)]),
        Card::new(vec![("v0", X), ("_", Ignored), ("lcid", Ignored)]),
    ])
}

pub fn eos_jwl() -> ModelSpec {
    ModelSpec::new("eos-jwl", "*EOS_JWL", vec![
        Card::new(vec![("eosid", Ignored), ("a", PRESSURE), ("b", PRESSURE), ("r1", X), ("r2", X), ("omeg", X), ("e0", PRESSURE), ("vo", X)]),
    ])
}

pub fn eos_jwlb() -> ModelSpec {
    let row = |prefix: &str| -> Card {
        Card::new((1..=5).map(|i| (format!("{prefix}{i}"), X)).collect())
    };

    ModelSpec::new("eos-jwlb", "*EOS_JWLB", vec![
        Card::new(vec![("eosid", Ignored), ("a1", PRESSURE), ("a2", PRESSURE), ("a3", PRESSURE), ("a4", PRESSURE), ("a5", PRESSURE)]),
        row("r"),
        row("al"),
        row("bl"),
        row("rl"),
        Card::new(vec![("c", PRESSURE), ("omega", X), ("e", PRESSURE), ("v0", X)]),
    ])
}

/// `*EOS_IGNITION_AND_GROWTH_OF_REACTION_IN_HE`
///
/// The growth coefficients go as 1/(time · pressure^x), the exponent being
/// `em` for `grow1` and `en` for `grow2`.
pub fn eos_ignition_growth() -> ModelSpec {
    let growth = |exponent: SlotRef| FieldDescriptor::PowerLaw { dim: Dim::RATE, per: Dim::PRESSURE.inverse(), exponent };

    ModelSpec::new("eos-ignition-growth", "*EOS_IGNITION_AND_GROWTH_OF_REACTION_IN_HE", vec![
        Card::new(vec![("eosid", Ignored), ("a", PRESSURE), ("b", PRESSURE), ("xp1", X), ("xp2", X), ("frer", X), ("g", SPECIFIC_ENERGY), ("r1", PRESSURE)]),
        Card::new(vec![("r2", PRESSURE), ("r3", SPECIFIC_ENERGY), ("r5", X), ("r6", X), ("fmxig", X), ("freq", RATE), ("grow1", growth(SlotRef::new(1, 7))), ("em", X)]),
        Card::new(vec![("ar1", X), ("es1", X), ("cvp", SPECIFIC_ENERGY), ("cvr", SPECIFIC_ENERGY), ("eetal", X), ("ccrit", X), ("enq", X), ("tmp0", X)]),
        Card::new(vec![("grow2", growth(SlotRef::new(3, 3))), ("ar2", X), ("es2", X), ("en", X), ("fmxgr", X), ("fmngr", X), ("_", Ignored), ("_", Ignored)]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let reg = builtin_registry();
        assert_eq!(reg.len(), 10);
        assert_eq!(reg.list_models(), vec![
            "eos-gruneisen", "eos-ignition-growth", "eos-jwl", "eos-jwlb", "eos-linear-polynomial",
            "mat-elastic", "mat-he-burn", "mat-jc", "mat-null", "mat-plastic-kinematic",
        ]);
        assert!(reg.list_known_keywords().contains(&"*EOS_IGNITION_AND_GROWTH_OF_REACTION_IN_HE"));
    }

    #[test]
    fn test_card_layouts() {
        let reg = builtin_registry();
        let expected = [
            ("mat-jc", 4), ("mat-null", 1), ("mat-he-burn", 1), ("eos-gruneisen", 2),
            ("eos-jwl", 1), ("eos-jwlb", 6), ("eos-ignition-growth", 4),
        ];
        for (name, n) in expected {
            let spec = reg.get(name).unwrap();
            assert_eq!(spec.card_count(), n, "Wrong number of cards for {name}");
            assert!(spec.has_numeric_fields(), "{name} should rescale something");
        }
    }

    #[test]
    fn test_field_dimensions() {
        let jc = mat_johnson_cook();
        assert_eq!(jc.field_name(1, 7), Some("epso"));
        assert_eq!(jc.descriptor(1, 7), RATE);
        assert_eq!(jc.descriptor(0, 1), DENSITY);
        assert_eq!(jc.descriptor(0, 0), Ignored);

        let jwlb = eos_jwlb();
        assert_eq!(jwlb.field_name(3, 4), Some("bl5"));
        assert_eq!(jwlb.descriptor(3, 4), X);
        assert_eq!(jwlb.descriptor(5, 2), PRESSURE);
        assert_eq!(jwlb.descriptor(5, 5), Ignored);
    }

    #[test]
    fn test_growth_exponents_point_at_named_fields() {
        let ig = eos_ignition_growth();
        for (card, slot, exp_name) in [(1, 6, "em"), (3, 0, "en")] {
            match ig.descriptor(card, slot) {
                FieldDescriptor::PowerLaw { exponent, .. } => {
                    assert_eq!(ig.field_name(exponent.card, exponent.slot), Some(exp_name));
                },
                d => panic!("Expected a power-law field at card {card} slot {slot}, got {d:?}"),
            }
        }
    }
}
