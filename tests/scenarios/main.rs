//! Scenario-based tests for the relay

#[path = "../helpers/mod.rs"]
mod helpers;

mod notification_order;
mod sequential_failure;
mod shutdown_drain;
mod success_chain;
