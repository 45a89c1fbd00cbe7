//! CLI module organization:
//! - args: argument structures
//! - commands: command execution
//! - discovery: source discovery collaborator

pub mod args;
pub mod commands;
pub mod discovery;

pub use args::*;
pub use commands::*;
