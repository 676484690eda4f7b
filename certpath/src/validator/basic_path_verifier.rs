//! A minimal [`PathVerifier`] that checks the structural properties of a candidate path

use log::error;

use crate::environment::path_builder_traits::{CheckIssuerSignature, PathVerifier, TrustStore};
use crate::util::error::*;
use crate::util::pdv_utilities::valid_at_time;
use crate::{CertificationPathSettings, PathCert};

/// `check_trust_anchor` verifies that the last certificate in the path is a trust anchor.
pub fn check_trust_anchor(trust_store: &dyn TrustStore, path: &[PathCert]) -> Result<()> {
    match path.last() {
        Some(ta) if trust_store.is_trusted_certificate(ta) => Ok(()),
        Some(ta) => {
            error!(
                "Path terminates with {}, which is not a trust anchor",
                ta.debug_string()
            );
            Err(Error::PathValidation(
                PathValidationStatus::MissingTrustAnchor,
            ))
        }
        None => Err(Error::PathValidation(PathValidationStatus::Misconfiguration)),
    }
}

/// `check_names` verifies that the normalized issuer of each certificate matches the normalized
/// subject of the certificate that follows it.
pub fn check_names(path: &[PathCert]) -> Result<()> {
    for pair in path.windows(2) {
        if pair[0].normalized_issuer() != pair[1].normalized_subject() {
            error!(
                "Name chaining violation between {} and {}",
                pair[0].debug_string(),
                pair[1].debug_string()
            );
            return Err(Error::PathValidation(
                PathValidationStatus::NameChainingFailure,
            ));
        }
    }
    Ok(())
}

/// The certificates that act as intermediate CAs in `path`, i.e., all but the target and the trust
/// anchor.
fn intermediates(path: &[PathCert]) -> &[PathCert] {
    if path.len() > 2 {
        &path[1..path.len() - 1]
    } else {
        &[]
    }
}

/// `check_basic_constraints` processes the intermediate CA certificates from the trust anchor
/// toward the target. Each certificate that is not self-issued consumes one unit of the path
/// length allowance, which starts at `max_intermediates` and is reduced by any pathLenConstraint
/// encountered. Certificates with parsed extensions must also carry a basicConstraints extension
/// that asserts cA.
pub fn check_basic_constraints(path: &[PathCert], max_intermediates: u8) -> Result<()> {
    let mut path_len_constraint = max_intermediates;
    for ca_cert in intermediates(path).iter().rev() {
        if !ca_cert.is_self_issued() {
            if path_len_constraint == 0 {
                error!(
                    "Path length constraint violation at {}",
                    ca_cert.debug_string()
                );
                return Err(Error::PathValidation(PathValidationStatus::InvalidPathLength));
            }
            path_len_constraint -= 1;
        }

        let exts = match ca_cert.extensions() {
            Some(exts) => exts,
            None => continue,
        };
        let bc = match &exts.basic_constraints {
            Some(bc) => bc,
            None => {
                error!("Missing basic constraints in {}", ca_cert.debug_string());
                return Err(Error::PathValidation(
                    PathValidationStatus::MissingBasicConstraints,
                ));
            }
        };
        if !bc.ca {
            error!("Invalid basic constraints in {}", ca_cert.debug_string());
            return Err(Error::PathValidation(
                PathValidationStatus::InvalidBasicConstraints,
            ));
        }
        if let Some(pl) = bc.path_len_constraint {
            path_len_constraint = path_len_constraint.min(pl);
        }
    }
    Ok(())
}

/// `check_key_usage` verifies that each intermediate CA certificate that has a keyUsage extension
/// asserts keyCertSign.
pub fn check_key_usage(path: &[PathCert]) -> Result<()> {
    for ca_cert in intermediates(path) {
        if let Some(ku) = ca_cert.extensions().and_then(|e| e.key_usage) {
            if !ku.key_cert_sign() {
                error!(
                    "keyCertSign is not set in key usage extension of {}",
                    ca_cert.debug_string()
                );
                return Err(Error::PathValidation(PathValidationStatus::InvalidKeyUsage));
            }
        }
    }
    Ok(())
}

/// `check_critical_extensions` verifies that neither the target nor any intermediate CA certificate
/// carries a critical extension that is not processed. The trust anchor is not checked.
pub fn check_critical_extensions(path: &[PathCert]) -> Result<()> {
    let certs: &[PathCert] = if path.len() > 1 {
        &path[..path.len() - 1]
    } else {
        &[]
    };
    for cert in certs {
        if let Some(exts) = cert.extensions() {
            if let Some(oid) = exts.unprocessed_critical_extensions.first() {
                error!(
                    "Unprocessed critical extension {} in {}",
                    oid,
                    cert.debug_string()
                );
                return Err(Error::PathValidation(
                    PathValidationStatus::UnprocessedCriticalExtension,
                ));
            }
        }
    }
    Ok(())
}

/// `check_validity` verifies that each certificate is valid at `toi`, expressed as seconds since Unix
/// epoch. The trust anchor is only checked when `enforce_ta_validity` is true. A `toi` of 0
/// disables the check.
pub fn check_validity(path: &[PathCert], toi: u64, enforce_ta_validity: bool) -> Result<()> {
    let certs = if enforce_ta_validity || path.is_empty() {
        path
    } else {
        &path[..path.len() - 1]
    };
    for cert in certs {
        valid_at_time(cert, toi, false)?;
    }
    Ok(())
}

/// `BasicPathVerifier` accepts a path if it is non-empty, ends at a trust anchor and chains by name.
/// Intermediate CA certificates must satisfy basic constraints and key usage requirements, and path
/// length limits from the settings and from pathLenConstraint values must hold. No certificate
/// other than the trust anchor may carry an unprocessed critical extension. Certificates must be
/// valid at the configured time of interest and, when a signature check function is supplied, each
/// signature must verify using the next certificate in the path.
///
/// Extension checks apply only to certificates whose extensions are known, i.e., those read by
/// [`ParsedCertificate::from_der`](crate::ParsedCertificate::from_der) or given extensions
/// explicitly.
///
/// It is not a full RFC 5280 validator. Policy, name constraint and revocation checks are left to
/// verifiers supplied by the caller.
pub struct BasicPathVerifier<'a> {
    trust_store: &'a dyn TrustStore,
    time_of_interest: u64,
    enforce_ta_validity: bool,
    max_intermediates: u8,
    check_signature: Option<CheckIssuerSignature>,
}

impl<'a> BasicPathVerifier<'a> {
    /// Creates a verifier that reads PS_TIME_OF_INTEREST, PS_ENFORCE_TRUST_ANCHOR_VALIDITY and
    /// PS_INITIAL_PATH_LENGTH_CONSTRAINT from `cps`.
    pub fn new(cps: &CertificationPathSettings, trust_store: &'a dyn TrustStore) -> Self {
        BasicPathVerifier {
            trust_store,
            time_of_interest: cps.get_time_of_interest(),
            enforce_ta_validity: cps.get_enforce_trust_anchor_validity(),
            max_intermediates: cps.get_initial_path_length_constraint(),
            check_signature: None,
        }
    }

    /// Adds a signature check applied to each certificate in the path and the certificate that
    /// follows it.
    pub fn with_signature_check(mut self, check_signature: CheckIssuerSignature) -> Self {
        self.check_signature = Some(check_signature);
        self
    }
}

impl PathVerifier for BasicPathVerifier<'_> {
    fn verify_path(&self, path: &[PathCert]) -> Result<()> {
        if path.is_empty() {
            error!("Empty path presented for verification");
            return Err(Error::PathValidation(PathValidationStatus::Misconfiguration));
        }
        check_trust_anchor(self.trust_store, path)?;
        check_names(path)?;
        check_basic_constraints(path, self.max_intermediates)?;
        check_key_usage(path)?;
        check_critical_extensions(path)?;
        check_validity(path, self.time_of_interest, self.enforce_ta_validity)?;
        if let Some(check_signature) = self.check_signature {
            for pair in path.windows(2) {
                if let Err(e) = check_signature(&pair[0], &pair[1]) {
                    error!(
                        "Signature verification failed for {}: {}",
                        pair[0].debug_string(),
                        e
                    );
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}
