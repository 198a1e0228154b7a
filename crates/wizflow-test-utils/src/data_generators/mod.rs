//! Test data generators for the wizflow wizards.
//!
//! Fixtures are internally consistent: the details input targets the same
//! endpoint, organization and space as [`deployment_target`].

mod autoscaler;
mod pipeline;

pub use autoscaler::*;
pub use pipeline::*;
