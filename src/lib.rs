//! Library surface for the PoC database tool.
//!
//! The binary in `main.rs` wires these modules to the CLI; the modules
//! themselves stay free of argument parsing so integration tests can drive
//! them directly.

pub mod cli;
pub mod config;
pub mod error;
pub mod metadata;
pub mod registry;
pub mod report;
pub mod runner;
pub mod scaffold;
pub mod store;

pub use error::PocError;
