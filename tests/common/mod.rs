//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.

mod constants;
mod fixtures;

pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{draft, entry, seed_catalog, TestCatalog};
