//! Logging and trace export setup for threadkeep binaries.

pub mod tracing_setup;
