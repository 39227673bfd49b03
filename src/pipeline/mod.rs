//! Pipeline orchestration: from an accepted trigger to its terminal notification

pub mod message;
pub mod orchestrator;
pub mod run;

pub use message::*;
pub use orchestrator::*;
pub use run::*;
