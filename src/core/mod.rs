//! Core domain models for the relay
//!
//! This module defines the configuration, trigger identity and run
//! lifecycle types the rest of the crate is built on.

pub mod command;
pub mod config;
pub mod project;
pub mod state;
pub mod trigger;

pub use command::*;
pub use project::*;
pub use state::*;
pub use trigger::*;
