//! Conversion pipeline
//!
//! ## Key Components
//!
//! - [`Converter`] - orchestrates fetch -> stage -> run -> read output
//! - [`ConvertOptions`] - client-supplied options, serialized to tool flags
//! - [`runner::run`] - deadline-bounded external process execution

mod engine;
mod options;
pub mod runner;

pub use engine::{ConvertError, Converter, FetchSpec};
pub use options::{ConvertOptions, GlobalFlags};
pub use runner::RunError;
