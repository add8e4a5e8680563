//! CLI subcommands.

pub mod common;
pub mod config;
pub mod search;
pub mod store;
