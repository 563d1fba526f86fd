//! Database repositories for data access layer
//!
//! `configuration` reads tenant upload configurations, their column rules and storage
//! configurations. `operation` appends and queries ledger records.

pub mod configuration;
pub mod operation;

pub use configuration::ConfigurationRepository;
pub use operation::OperationRepository;
