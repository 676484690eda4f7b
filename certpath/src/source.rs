//! Sources of trust anchors and candidate issuer certificates

pub mod cert_issuer_source_static;
pub mod trust_store_in_memory;

#[cfg(feature = "std")]
pub mod file_utils;

#[cfg(feature = "remote")]
pub mod aia_cert_issuer_source;

pub use crate::{source::cert_issuer_source_static::*, source::trust_store_in_memory::*};

#[cfg(feature = "std")]
pub use crate::source::file_utils::*;

#[cfg(feature = "remote")]
pub use crate::source::aia_cert_issuer_source::*;
