//! Test helpers shared by unit and integration tests

pub mod instance;
pub mod mock;
pub mod setup;
