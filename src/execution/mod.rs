//! Command execution engine

pub mod engine;
pub mod executor;
pub mod result;

pub use engine::*;
pub use executor::*;
pub use result::*;
