//! Structures and functions related to configuring certification path building and verification

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::time::Duration;

use cfg_if::cfg_if;
use pkiprocmacros::*;

use crate::alloc::string::ToString;

cfg_if! {
    if #[cfg(feature = "std")] {
        use serde::{Deserialize, Serialize};
        use std::path::Path;
        use std::time::{SystemTime, UNIX_EPOCH};
        use crate::{Error, Result};
    }
}

/// `Strings` is a typedef for a vector of String values.
pub type Strings = Vec<String>;

/// `CertificationPathSettings` is a typedef for a `BTreeMap` that maps arbitrary string values to a
/// variant map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct CertificationPathSettings(pub BTreeMap<String, CertificationPathProcessingTypes>);

impl CertificationPathSettings {
    /// Creates a new empty [`CertificationPathSettings`]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Values that can be stored in a [`CertificationPathSettings`] map
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub enum CertificationPathProcessingTypes {
    /// Represents bool values
    Bool(bool),
    /// Represents u8 values
    U8(u8),
    /// Represents u64 values
    U64(u64),
    /// Represents String values
    String(String),
    /// Represents vectors of Strings
    Strings(Strings),
    /// Represents duration or a timeout
    Duration(Duration),
}

//-----------------------------------------------------------------------------------------------
// Types of path settings
//-----------------------------------------------------------------------------------------------
/// `PS_TIME_OF_INTEREST` is used to retrieve a Time value from a [`CertificationPathSettings`]
/// object. This corresponds to the current date/time value described in
/// [RFC 5280 Section 6.1.1]: <https://datatracker.ietf.org/doc/html/rfc5280#section-6.1.1>. The value
/// need not be the current date/time and can be a time in the past to support retrospective validation.
/// The value is expressed as a u64 containing seconds since Unix epoch (i.e., 1970-01-01T00:00:00Z).
/// By default, the value is set to current time if std is available, else the value defaults to 0.
/// A value of 0 disables validity checks.
pub static PS_TIME_OF_INTEREST: &str = "psTimeOfInterest";

/// `PS_ENFORCE_TRUST_ANCHOR_VALIDITY` is used to retrieve a boolean value from a [`CertificationPathSettings`]
/// object. When true, the validity window of the trust anchor that terminates a path is checked
/// against the time of interest. By default, this setting is set to true.
pub static PS_ENFORCE_TRUST_ANCHOR_VALIDITY: &str = "psEnforceTrustAnchorValidity";

/// `PS_INITIAL_PATH_LENGTH_CONSTRAINT` is used to retrieve a u8 value from a [`CertificationPathSettings`]
/// object. This value establishes the maximum number of intermediate CA certificates that a path
/// may contain, not counting self-issued certificates. By default, the value is set to 15, as defined by `PS_MAX_PATH_LENGTH_CONSTRAINT`.
pub static PS_INITIAL_PATH_LENGTH_CONSTRAINT: &str = "psInitialPathLengthConstraint";

/// `PS_MAX_PATH_LENGTH_CONSTRAINT` sets the maximum length path accepted by the default verifier
pub static PS_MAX_PATH_LENGTH_CONSTRAINT: u8 = 15;

/// `PS_AIA_TIMEOUT_DEFAULT` sets the maximum amount of time to spend retrieving certificates from a
/// caIssuers URI.
pub static PS_AIA_TIMEOUT_DEFAULT: Duration = Duration::from_secs(10);

/// `PS_AIA_TIMEOUT` is used to retrieve a Duration that expresses the maximum amount of time to spend
/// retrieving certificates from a single caIssuers URI.
pub static PS_AIA_TIMEOUT: &str = "psAiaTimeout";

/// `PS_MAX_PATH_ATTEMPTS` is used to retrieve a u64 value from a [`CertificationPathSettings`]
/// object. It bounds the number of candidate paths a path builder will verify before giving up.
/// By default, the value is 0, which imposes no bound.
pub static PS_MAX_PATH_ATTEMPTS: &str = "psMaxPathAttempts";

/// `PS_URI_BLOCKLIST` is used to retrieve a list of URIs that should not be used when retrieving
/// certificates from caIssuers URIs.
pub static PS_URI_BLOCKLIST: &str = "psUriBlocklist";

cps_gets_and_sets_with_default!(PS_TIME_OF_INTEREST, u64, {
    #[cfg(feature = "std")]
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(n) => n.as_secs(),
        Err(_) => 0,
    }
    #[cfg(not(feature = "std"))]
    0
});
cps_gets_and_sets_with_default!(PS_ENFORCE_TRUST_ANCHOR_VALIDITY, bool, true);
cps_gets_and_sets_with_default!(
    PS_INITIAL_PATH_LENGTH_CONSTRAINT,
    u8,
    PS_MAX_PATH_LENGTH_CONSTRAINT
);
cps_gets_and_sets_with_default!(PS_AIA_TIMEOUT, Duration, PS_AIA_TIMEOUT_DEFAULT);
cps_gets_and_sets_with_default!(PS_MAX_PATH_ATTEMPTS, u64, 0);
cps_gets_and_sets!(PS_URI_BLOCKLIST, Strings);

/// `read_settings` accepts a string containing the name of a file that notionally contains JSON data that
/// represents CertificationPathSettings.
///
/// Default settings are returned when no file name is provided or the named file does not exist.
#[cfg(feature = "std")]
pub fn read_settings(fname: &Option<String>) -> Result<CertificationPathSettings> {
    if let Some(fname) = fname {
        let p = Path::new(fname.as_str());
        if Path::exists(p) {
            let json = std::fs::read(p)?;
            return match serde_json::from_slice(&json) {
                Ok(cps) => Ok(cps),
                Err(_e) => Err(Error::ParseError),
            };
        }
    }
    Ok(CertificationPathSettings::new())
}

#[test]
fn test_default_gets_cps() {
    let cps = CertificationPathSettings::default();

    #[cfg(feature = "std")]
    {
        let before = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
        assert!(cps.get_time_of_interest() >= before.as_secs());
    }
    #[cfg(not(feature = "std"))]
    {
        assert_eq!(cps.get_time_of_interest(), 0);
    }

    assert!(cps.get_enforce_trust_anchor_validity());
    assert_eq!(15, cps.get_initial_path_length_constraint());
    assert_eq!(Duration::from_secs(10), cps.get_aia_timeout());
    assert_eq!(0, cps.get_max_path_attempts());
    assert_eq!(None, cps.get_uri_blocklist());
}

#[test]
fn test_gets_and_sets_cps() {
    let mut cps = CertificationPathSettings::new();
    cps.set_time_of_interest(1_700_000_000);
    cps.set_enforce_trust_anchor_validity(false);
    cps.set_initial_path_length_constraint(2);
    cps.set_aia_timeout(Duration::from_secs(3));
    cps.set_max_path_attempts(7);
    cps.set_uri_blocklist(alloc::vec!["http://example.com/blocked.p7c".to_string()]);

    assert_eq!(1_700_000_000, cps.get_time_of_interest());
    assert!(!cps.get_enforce_trust_anchor_validity());
    assert_eq!(2, cps.get_initial_path_length_constraint());
    assert_eq!(Duration::from_secs(3), cps.get_aia_timeout());
    assert_eq!(7, cps.get_max_path_attempts());
    assert_eq!(1, cps.get_uri_blocklist().unwrap_or_default().len());

    // a value of the wrong type falls back to the default
    cps.0.insert(
        PS_INITIAL_PATH_LENGTH_CONSTRAINT.to_string(),
        CertificationPathProcessingTypes::Bool(true),
    );
    assert_eq!(
        PS_MAX_PATH_LENGTH_CONSTRAINT,
        cps.get_initial_path_length_constraint()
    );
}
