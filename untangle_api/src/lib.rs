//! Shared diff and line-label data models consumed by the core library and tool adapters.

pub mod diff;
pub mod parse;
pub mod truth;

pub use diff::*;
pub use parse::*;
pub use truth::*;
