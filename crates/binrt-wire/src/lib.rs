#![warn(clippy::pedantic)]

pub mod bits;
pub mod bytes;
pub mod error;
pub mod process;
pub mod validation;

pub use bits::{BitAccumulator, mask_ones};
pub use error::StreamError;
pub use validation::{Endian, ParseError, ValidationError, ValidationKind};
