//! Tabula Processing Library
//!
//! Validation of tabular files against tenant column rules. The engine is synchronous and
//! CPU-bound; async callers run it on a blocking worker thread.
//!
//! - `rules`: compiles column rules into per-type checks
//! - `reader`: lazy, single-pass record reader over the file bytes
//! - `validator`: file-level checks (extension, size)
//! - `engine`: the `ValidationEngine` tying them together
//! - `template`: prototype file with the expected headers

pub mod engine;
pub mod reader;
pub mod rules;
pub mod template;
pub mod validator;

pub use engine::ValidationEngine;
pub use rules::{CompiledRules, RuleError};
pub use template::{build_template, template_file_name, TemplateError};
pub use validator::FileValidator;
