//! The stack of issuer generators that makes up the path currently being explored

use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;

use crate::builder::cert_issuers_iter::CertIssuersIter;
use crate::{CertificateList, ParsedCertificate};

/// Identity of a certificate for the purpose of loop detection: normalized subject, subject
/// alternative names and SubjectPublicKeyInfo. Certificates that differ only in encoding, validity
/// or issuer share a key.
type PathKey = (Vec<u8>, Vec<u8>, Vec<u8>);

fn path_key(cert: &ParsedCertificate) -> PathKey {
    (
        cert.normalized_subject().to_vec(),
        cert.subject_alt_names().to_vec(),
        cert.spki().to_vec(),
    )
}

/// `CertIssuerIterPath` tracks the certificates in the current path, target first, each paired with
/// the generator of its issuers. No two entries share a [`PathKey`].
#[derive(Default)]
pub(crate) struct CertIssuerIterPath {
    cur_path: Vec<CertIssuersIter>,
    present_certs: BTreeSet<PathKey>,
}

impl CertIssuerIterPath {
    /// Returns true if a certificate with the same subject, subject alternative names and key as
    /// `cert` is already in the path.
    pub(crate) fn is_present(&self, cert: &ParsedCertificate) -> bool {
        self.present_certs.contains(&path_key(cert))
    }

    /// Appends a generator to the path. The caller must have checked that the generator's
    /// certificate is not already present.
    pub(crate) fn append(&mut self, cert_issuers_iter: CertIssuersIter) {
        let added = self
            .present_certs
            .insert(path_key(cert_issuers_iter.cert()));
        assert!(added, "certificate appended to path twice");
        self.cur_path.push(cert_issuers_iter);
    }

    /// Removes the last generator from the path, dropping it along with any outstanding requests.
    pub(crate) fn pop(&mut self) {
        assert!(!self.cur_path.is_empty(), "pop called on an empty path");
        if let Some(cert_issuers_iter) = self.cur_path.pop() {
            self.present_certs
                .remove(&path_key(cert_issuers_iter.cert()));
        }
    }

    /// Returns the certificates in the path, target first.
    pub(crate) fn copy_path(&self) -> CertificateList {
        self.cur_path
            .iter()
            .map(|node| node.cert().clone())
            .collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.cur_path.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.cur_path.len()
    }

    /// The generator for the last certificate in the path
    pub(crate) fn back_mut(&mut self) -> Option<&mut CertIssuersIter> {
        self.cur_path.last_mut()
    }

    /// Returns a string listing the certificates in the path for use in log output.
    pub(crate) fn path_debug_string(&self) -> String {
        let mut s = String::new();
        for node in &self.cur_path {
            if !s.is_empty() {
                s.push_str(" <- ");
            }
            s.push_str(&node.cert().debug_string());
        }
        s
    }
}
