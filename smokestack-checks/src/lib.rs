//! # Smokestack Checks
//!
//! Contract checks and operational control for the RAG stack: the check
//! registry, per-service checks, the three suites, the external-script
//! test runner, and the stack lifecycle controller.

pub mod agent;
pub mod elasticsearch;
pub mod lifecycle;
pub mod llm;
pub mod registry;
pub mod runner;
pub mod suites;
pub mod webui;

// Re-export commonly used types at the crate root.
pub use lifecycle::StackController;
pub use registry::{Check, CheckContext, CheckRegistry, FailureMode};
pub use runner::{discover_scripts, run_dir, run_script};
pub use suites::{Suite, run_suite};
