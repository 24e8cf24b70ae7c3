//! Domain models for the scribe pipeline.

mod encounter;
mod pii;
mod transcript;

pub use encounter::*;
pub use pii::*;
pub use transcript::*;
