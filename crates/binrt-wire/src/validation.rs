use std::fmt;

use crate::bytes::format_hex;
use crate::error::StreamError;

/// What a failed `valid:` check was comparing against.
///
/// Values are rendered to strings by the caller so a single error type
/// serves integers, floats, strings and byte arrays alike.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationKind {
    /// Required `actual == expected`.
    NotEqual { expected: String, actual: String },
    /// Required `actual >= min`.
    LessThan { min: String, actual: String },
    /// Required `actual <= max`.
    GreaterThan { max: String, actual: String },
    /// Required `actual` to be one of a fixed list.
    NotAnyOf { actual: String },
    /// A free-form validation expression evaluated to false.
    Expr { actual: String },
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotEqual { expected, actual } => {
                write!(f, "not equal, expected {expected}, but got {actual}")
            }
            Self::LessThan { min, actual } => {
                write!(f, "not in range, min {min}, but got {actual}")
            }
            Self::GreaterThan { max, actual } => {
                write!(f, "not in range, max {max}, but got {actual}")
            }
            Self::NotAnyOf { actual } => write!(f, "not any of the list, got {actual}"),
            Self::Expr { actual } => write!(f, "not matching the expression, got {actual}"),
        }
    }
}

/// A field value failed a format-level validation check.
///
/// `src_path` points at the element of the format description that
/// declared the check (e.g. `/types/header/seq/0`), and `pos` is the
/// stream position when the check ran.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{src_path}: at pos {pos}: validation failed: {kind}")]
pub struct ValidationError {
    pub pos: u64,
    pub src_path: String,
    pub kind: ValidationKind,
}

impl ValidationError {
    pub fn new(pos: u64, src_path: impl Into<String>, kind: ValidationKind) -> Self {
        Self {
            pos,
            src_path: src_path.into(),
            kind,
        }
    }

    /// `NotEqual` for byte arrays, rendered as `[AA BB]`.
    pub fn not_equal_bytes(
        pos: u64,
        src_path: impl Into<String>,
        expected: &[u8],
        actual: &[u8],
    ) -> Self {
        Self::new(
            pos,
            src_path,
            ValidationKind::NotEqual {
                expected: format_hex(expected),
                actual: format_hex(actual),
            },
        )
    }

    pub fn not_equal(
        pos: u64,
        src_path: impl Into<String>,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> Self {
        Self::new(
            pos,
            src_path,
            ValidationKind::NotEqual {
                expected: expected.to_string(),
                actual: actual.to_string(),
            },
        )
    }

    pub fn less_than(
        pos: u64,
        src_path: impl Into<String>,
        min: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> Self {
        Self::new(
            pos,
            src_path,
            ValidationKind::LessThan {
                min: min.to_string(),
                actual: actual.to_string(),
            },
        )
    }

    pub fn greater_than(
        pos: u64,
        src_path: impl Into<String>,
        max: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> Self {
        Self::new(
            pos,
            src_path,
            ValidationKind::GreaterThan {
                max: max.to_string(),
                actual: actual.to_string(),
            },
        )
    }

    pub fn not_any_of(pos: u64, src_path: impl Into<String>, actual: impl fmt::Display) -> Self {
        Self::new(
            pos,
            src_path,
            ValidationKind::NotAnyOf {
                actual: actual.to_string(),
            },
        )
    }

    pub fn expr(pos: u64, src_path: impl Into<String>, actual: impl fmt::Display) -> Self {
        Self::new(
            pos,
            src_path,
            ValidationKind::Expr {
                actual: actual.to_string(),
            },
        )
    }
}

/// Errors a generated parser returns to its caller.
///
/// ```text
///   ParseError
///   ├── Stream(StreamError)         ← runtime read / transform failure
///   ├── Validation(ValidationError) ← a `valid:` check failed
///   └── UndecidedEndianness         ← endianness switch had no match
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Default endianness is chosen by a switch and no case matched.
    #[error("unable to decide on endianness")]
    UndecidedEndianness,
}

/// Byte order selected at parse time by generated code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    /// Turn the outcome of an endianness switch into a decision.
    ///
    /// # Errors
    ///
    /// [`ParseError::UndecidedEndianness`] when no case matched.
    pub fn resolve(decided: Option<Self>) -> Result<Self, ParseError> {
        decided.ok_or(ParseError::UndecidedEndianness)
    }

    /// Byte order of the target platform.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }
}
