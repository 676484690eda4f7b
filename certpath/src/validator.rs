//! Certificate representation, path settings and a basic path verifier

pub mod basic_path_verifier;
pub mod parsed_certificate;
pub mod path_settings;

pub use crate::{
    validator::basic_path_verifier::*, validator::parsed_certificate::*,
    validator::path_settings::*,
};
