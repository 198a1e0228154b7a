//! Environment setup builders for testing the wizards.
//!
//! A harness wires a controller and its engine to the in-memory fakes and
//! keeps handles on the fakes so tests can seed data and inspect calls.

mod harness;

pub use harness::*;
