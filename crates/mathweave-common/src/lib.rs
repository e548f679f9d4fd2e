//! Shared pieces for the mathweave crates: errors, configuration and
//! tracing setup.

pub mod config;
pub mod error;
#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use config::EditorConfig;
pub use error::{MathweaveError, ParseError, ParseErrorKind, SerDeError, parse_json};
