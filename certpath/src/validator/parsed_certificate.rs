//! Immutable, shareable certificate handle consumed by the path builder

use alloc::format;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use const_oid::db::rfc5912::{
    ID_CE_AUTHORITY_KEY_IDENTIFIER, ID_CE_BASIC_CONSTRAINTS, ID_CE_KEY_USAGE,
    ID_CE_SUBJECT_ALT_NAME, ID_CE_SUBJECT_KEY_IDENTIFIER, ID_PE_AUTHORITY_INFO_ACCESS,
};
use const_oid::ObjectIdentifier;
use der::{Decode, Encode};
use x509_cert::ext::pkix::{BasicConstraints, KeyUsage};
use x509_cert::Certificate;

use crate::util::error::*;
use crate::util::pdv_utilities::{collect_ca_issuers_uris, name_to_string, normalize_name};

/// `PathCert` is a reference counted [`ParsedCertificate`]. Clones are cheap and share the same
/// underlying certificate.
pub type PathCert = Arc<ParsedCertificate>;

/// `CertificateList` is a typedef for a vector of [`PathCert`] values. Candidate paths are expressed
/// as a `CertificateList` ordered from the target certificate to the trust anchor.
pub type CertificateList = Vec<PathCert>;

/// [`ParsedExtensions`] holds the extensions of a certificate that bear on whether it may act as
/// an issuer, as read by [`ParsedCertificate::from_der`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParsedExtensions {
    /// Decoded basicConstraints extension, if present
    pub basic_constraints: Option<BasicConstraints>,
    /// Decoded keyUsage extension, if present
    pub key_usage: Option<KeyUsage>,
    /// Object identifiers of critical extensions that are not understood
    pub unprocessed_critical_extensions: Vec<ObjectIdentifier>,
}

/// [`ParsedCertificate`] exposes the handful of projections of a certificate that path building
/// needs: the raw DER, normalized subject and issuer names, the raw subject alternative name
/// extension value and the encoded SubjectPublicKeyInfo. The optional validity window and caIssuers
/// URIs are used by [`BasicPathVerifier`](crate::BasicPathVerifier) and the AIA issuer source.
///
/// Instances are immutable after construction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedCertificate {
    der_cert: Vec<u8>,
    normalized_subject: Vec<u8>,
    normalized_issuer: Vec<u8>,
    subject_alt_names: Vec<u8>,
    spki: Vec<u8>,
    not_before: Option<u64>,
    not_after: Option<u64>,
    ca_issuers_uris: Vec<String>,
    extensions: Option<ParsedExtensions>,
    subject_string: String,
    issuer_string: String,
}

impl ParsedCertificate {
    /// Creates a [`ParsedCertificate`] from values produced by an external parser. The normalized
    /// names must have been produced by the same normalization routine for all certificates that
    /// participate in a path building operation.
    pub fn new(
        der_cert: Vec<u8>,
        normalized_subject: Vec<u8>,
        normalized_issuer: Vec<u8>,
        subject_alt_names: Vec<u8>,
        spki: Vec<u8>,
    ) -> Self {
        let subject_string = String::from_utf8_lossy(&normalized_subject).to_string();
        let issuer_string = String::from_utf8_lossy(&normalized_issuer).to_string();
        ParsedCertificate {
            der_cert,
            normalized_subject,
            normalized_issuer,
            subject_alt_names,
            spki,
            not_before: None,
            not_after: None,
            ca_issuers_uris: Vec::new(),
            extensions: None,
            subject_string,
            issuer_string,
        }
    }

    /// Sets the validity window, expressed as seconds since the Unix epoch.
    pub fn with_validity(mut self, not_before: u64, not_after: u64) -> Self {
        self.not_before = Some(not_before);
        self.not_after = Some(not_after);
        self
    }

    /// Sets the list of caIssuers URIs from which issuers of this certificate may be retrieved.
    pub fn with_ca_issuers_uris(mut self, uris: Vec<String>) -> Self {
        self.ca_issuers_uris = uris;
        self
    }

    /// Sets the extensions consulted when the certificate acts as an issuer. Certificates created
    /// with [`ParsedCertificate::new`] have none, which verifiers treat as unconstrained.
    pub fn with_extensions(mut self, extensions: ParsedExtensions) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// Parses a DER encoded X.509 certificate. Malformed basicConstraints or keyUsage extensions
    /// cause parsing to fail.
    pub fn from_der(enc_cert: &[u8]) -> Result<Self> {
        let cert = Certificate::from_der(enc_cert)?;
        let tbs = &cert.tbs_certificate;

        let mut subject_alt_names = Vec::new();
        let mut extensions = ParsedExtensions::default();
        if let Some(exts) = &tbs.extensions {
            for ext in exts {
                let value = ext.extn_value.as_bytes();
                if ext.extn_id == ID_CE_SUBJECT_ALT_NAME {
                    subject_alt_names = value.to_vec();
                } else if ext.extn_id == ID_CE_BASIC_CONSTRAINTS {
                    extensions.basic_constraints = Some(BasicConstraints::from_der(value)?);
                } else if ext.extn_id == ID_CE_KEY_USAGE {
                    extensions.key_usage = Some(KeyUsage::from_der(value)?);
                } else if ext.critical
                    && ext.extn_id != ID_PE_AUTHORITY_INFO_ACCESS
                    && ext.extn_id != ID_CE_AUTHORITY_KEY_IDENTIFIER
                    && ext.extn_id != ID_CE_SUBJECT_KEY_IDENTIFIER
                {
                    extensions.unprocessed_critical_extensions.push(ext.extn_id);
                }
            }
        }

        let mut ca_issuers_uris = Vec::new();
        collect_ca_issuers_uris(&cert, &mut ca_issuers_uris);

        Ok(ParsedCertificate {
            der_cert: enc_cert.to_vec(),
            normalized_subject: normalize_name(&tbs.subject)?,
            normalized_issuer: normalize_name(&tbs.issuer)?,
            subject_alt_names,
            spki: tbs.subject_public_key_info.to_der()?,
            not_before: Some(tbs.validity.not_before.to_unix_duration().as_secs()),
            not_after: Some(tbs.validity.not_after.to_unix_duration().as_secs()),
            ca_issuers_uris,
            extensions: Some(extensions),
            subject_string: name_to_string(&tbs.subject),
            issuer_string: name_to_string(&tbs.issuer),
        })
    }

    /// Raw DER encoding of the certificate
    pub fn der_cert(&self) -> &[u8] {
        &self.der_cert
    }

    /// Normalized subject name
    pub fn normalized_subject(&self) -> &[u8] {
        &self.normalized_subject
    }

    /// Normalized issuer name
    pub fn normalized_issuer(&self) -> &[u8] {
        &self.normalized_issuer
    }

    /// Raw value of the subject alternative name extension, empty when absent
    pub fn subject_alt_names(&self) -> &[u8] {
        &self.subject_alt_names
    }

    /// DER encoded SubjectPublicKeyInfo
    pub fn spki(&self) -> &[u8] {
        &self.spki
    }

    /// notBefore as seconds since the Unix epoch, if known
    pub fn not_before(&self) -> Option<u64> {
        self.not_before
    }

    /// notAfter as seconds since the Unix epoch, if known
    pub fn not_after(&self) -> Option<u64> {
        self.not_after
    }

    /// HTTP caIssuers URIs read from the authority information access extension
    pub fn ca_issuers_uris(&self) -> &[String] {
        &self.ca_issuers_uris
    }

    /// Extensions read from the certificate, or `None` when it was not parsed from DER and no
    /// extensions were supplied
    pub fn extensions(&self) -> Option<&ParsedExtensions> {
        self.extensions.as_ref()
    }

    /// `is_self_issued` returns true if the normalized subject and issuer names are equal.
    pub fn is_self_issued(&self) -> bool {
        self.normalized_subject == self.normalized_issuer
    }

    /// `debug_string` returns a short string identifying the certificate for use in log output.
    pub fn debug_string(&self) -> String {
        format!("S: {} I: {}", self.subject_string, self.issuer_string)
    }
}

impl TryFrom<&[u8]> for ParsedCertificate {
    type Error = Error;

    fn try_from(enc_cert: &[u8]) -> Result<Self> {
        ParsedCertificate::from_der(enc_cert)
    }
}
