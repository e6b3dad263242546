//! Generic tree-to-object decoding.
//!
//! The OneBusAway XML schema tags fields in `camelCase`; each model type
//! declares the exact tag set it accepts and maps it onto its own fields.
//! Unknown tags fail the decode rather than being dropped, so schema drift
//! and typos surface immediately.

mod attrs;
mod error;

pub use attrs::{AttributeMap, parse_bool, parse_int};
pub use error::DecodeError;
