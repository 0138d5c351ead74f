//! Booking engine CLI library.
//!
//! Thin host around the `booking-engine` call contracts: argument parsing,
//! policy loading, and the JSON-in/JSON-out subcommands.

mod cli;
pub mod commands;
pub mod config;

pub use cli::{Cli, Commands, InputArgs, PolicyOverrides};
