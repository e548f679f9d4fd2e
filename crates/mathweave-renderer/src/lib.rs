//! Math rendering for mathweave.
//!
//! Turns a fully expanded LaTeX string into MathML. Malformed input never
//! fails the caller; it comes back as an inline error span instead.

pub mod math;

pub use math::{Layout, MathResult, render_math};
