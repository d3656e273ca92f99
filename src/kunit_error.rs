//! Errors raised while converting keyword decks
use std::fmt::Display;
use pest::RuleType;

/// Type alias for a `Result` with [`KError`] as the error type.
pub type KResult<T> = Result<T, KError>;

/// Where in a deck a field error happened.
///
/// `card` and `slot` are zero-based indices into the model spec's cards and
/// the 10-character slots of a card. `line` is the 1-based line number in the
/// input deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLocation {
    pub keyword: String,
    pub card: usize,
    pub slot: usize,
    pub line: usize,
    pub field: Option<String>,
}

impl Display for FieldLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} card {} slot {}", self.keyword, self.card + 1, self.slot + 1)?;
        if let Some(name) = &self.field {
            write!(f, " ('{name}')")?;
        }
        write!(f, " at line {}", self.line)
    }
}

/// An error related to unit systems, model specs, or deck contents
#[derive(Debug)]
pub enum KError {
    /// A unit system name is not in the built-in table.
    UnknownUnitSystem(String),

    /// A model name given as a selection is not registered.
    UnknownModel(String),

    /// A slot expected to hold a number could not be parsed. `text` is the
    /// slot text as it appeared in the deck.
    MalformedField{ text: String, location: Option<FieldLocation> },

    /// A converted value cannot be written into the fixed width. A `value` of
    /// zero means a non-zero field underflowed to zero.
    FieldOverflow{ value: f64, location: Option<FieldLocation> },

    /// A field transform names a field or model the registry cannot resolve.
    InvalidTransform{ model: String, field: String, reason: String },

    /// A material record is incomplete or inconsistent.
    InvalidMaterial{ id: String, reason: String },

    /// Two model specs claim the same keyword.
    DuplicateKeyword(String),

    /// Two model specs share the same model name.
    DuplicateModel(String),

    /// The deck could not be read.
    ReadError(std::io::Error),
}

impl Display for KError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KError::UnknownUnitSystem(name) => {
                write!(f, "Unknown unit system '{name}'. Known: {}", crate::units::unit_keys().join(", "))
            },
            KError::UnknownModel(name) => write!(f, "Unknown model '{name}'"),
            KError::MalformedField { text, location } => {
                if let Some(loc) = location {
                    write!(f, "Could not parse '{text}' as a number in {loc}")
                } else {
                    write!(f, "Could not parse '{text}' as a number")
                }
            },
            KError::FieldOverflow { value, location } if *value == 0.0 => {
                if let Some(loc) = location {
                    write!(f, "Non-zero value underflows to zero after conversion in {loc}")
                } else {
                    write!(f, "Non-zero value underflows to zero after conversion")
                }
            },
            KError::FieldOverflow { value, location } => {
                if let Some(loc) = location {
                    write!(f, "Value {value:e} does not fit in a {}-character field in {loc}", crate::fixed::FIELD_WIDTH)
                } else {
                    write!(f, "Value {value:e} does not fit in a {}-character field", crate::fixed::FIELD_WIDTH)
                }
            },
            KError::InvalidTransform { model, field, reason } => write!(f, "Invalid transform for '{field}' of model '{model}': {reason}"),
            KError::InvalidMaterial { id, reason } => write!(f, "Invalid material '{id}': {reason}"),
            KError::DuplicateKeyword(kw) => write!(f, "Keyword '{kw}' is registered by more than one model spec"),
            KError::DuplicateModel(name) => write!(f, "Model name '{name}' is registered more than once"),
            KError::ReadError(e) => write!(f, "Error reading deck: {e}"),
        }
    }
}

impl std::error::Error for KError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KError::ReadError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for KError {
    fn from(value: std::io::Error) -> Self {
        Self::ReadError(value)
    }
}

impl KError {
    /// Build a `MalformedField` error from a failed pest parse of `text`.
    pub fn from_pest<R: RuleType>(_e: pest::error::Error<R>, text: &str) -> Self {
        Self::MalformedField { text: text.to_string(), location: None }
    }

    /// Attach a location to field errors. Other variants pass through unchanged.
    pub fn at(self, location: FieldLocation) -> Self {
        match self {
            Self::MalformedField { text, location: _ } => Self::MalformedField { text, location: Some(location) },
            Self::FieldOverflow { value, location: _ } => Self::FieldOverflow { value, location: Some(location) },
            _ => self
        }
    }

    /// The location of a field error, if one was attached.
    pub fn location(&self) -> Option<&FieldLocation> {
        match self {
            Self::MalformedField { text: _, location } => location.as_ref(),
            Self::FieldOverflow { value: _, location } => location.as_ref(),
            _ => None
        }
    }
}
