//! Test helpers shared across fsl-anat gear crates.

pub mod fixture;
pub mod runner;

pub use fixture::GearFixture;
pub use runner::{ScriptedRunner, simulated_tools};
