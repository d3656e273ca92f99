//! Convert LS-DYNA style keyword decks between unit systems.
//!
//! Decks are plain text made of keyword lines (`*EOS_JWL`) followed by data
//! cards of eight 10-character fields. This crate rescales the numeric fields
//! of known keywords ([`models`]) from one unit system ([`units`]) to another
//! while leaving every other byte of the deck alone. The entry points are
//! [`engine::convert_text`] and [`engine::Converter`]; [`materials`] builds
//! decks out of stored material records.
extern crate pest;
#[macro_use]
extern crate pest_derive;
pub mod kunit_error;
pub mod units;
pub mod fixed;
pub(crate) mod parsing;
pub mod model_specs;
pub mod models;
pub mod transforms;
pub mod engine;
pub mod materials;
pub mod deck_io;
