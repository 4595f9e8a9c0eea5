//! Channel implementations for nlsh.

pub mod cli;

pub use cli::CliChannel;
