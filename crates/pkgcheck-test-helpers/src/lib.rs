//! Test utilities and fixtures for pkgcheck
//!
//! This crate provides shared test helpers for the integration tests
//! (tests/ directories) and benches of the workspace crates.

pub mod check;
pub mod fixtures;
pub mod mocks;
pub mod temp_package;

pub use temp_package::TempPackage;
