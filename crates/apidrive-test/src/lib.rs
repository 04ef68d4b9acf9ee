//! Test harnesses for apidrive.
//!
//! Provides the OpenAPI fixtures used across the workspace and
//! `PetStoreServer`, a stateful wiremock petstore for end-to-end tests.

pub mod fixtures;
pub mod petstore;

#[cfg(test)]
mod e2e;

pub use fixtures::{fixture_path, load_fixture};
pub use petstore::{PetStore, PetStoreServer};
