//! Backtracking discovery of certification paths and the reporting of their verification outcomes

mod cert_issuer_iter_path;
mod cert_issuers_iter;
pub mod cert_path_iter;
pub mod path_builder;
pub mod path_results;

pub use crate::{builder::cert_path_iter::*, builder::path_builder::*, builder::path_results::*};
