//! Basic utility functionality supporting certification path building

pub mod error;
pub mod pdv_utilities;

pub use crate::{util::error::*, util::pdv_utilities::*};
