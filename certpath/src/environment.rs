//! Traits implemented by the trust stores, issuer sources and verifiers consulted while building paths

pub mod path_builder_traits;

pub use crate::environment::path_builder_traits::*;
