//! Provides an in-memory, synchronous source of intermediate CA certificates

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use log::debug;

use crate::environment::path_builder_traits::CertIssuerSource;
use crate::{CertificateList, ParsedCertificate, PathCert};

/// [`CertIssuerSourceStatic`] holds a fixed collection of certificates, indexed by normalized
/// subject name. For a given certificate it returns, synchronously and in insertion order, every held
/// certificate whose subject matches that certificate's issuer name. It never offers asynchronous
/// results.
#[derive(Clone, Default)]
pub struct CertIssuerSourceStatic {
    /// Certificates in the order they were added
    certs: CertificateList,

    /// Maps normalized subject names to indices into certs
    name_map: BTreeMap<Vec<u8>, Vec<usize>>,
}

impl CertIssuerSourceStatic {
    /// Creates an empty source
    pub fn new() -> CertIssuerSourceStatic {
        CertIssuerSourceStatic::default()
    }

    /// add_cert makes the presented certificate available as an issuer candidate.
    pub fn add_cert(&mut self, cert: PathCert) {
        let index = self.certs.len();
        self.name_map
            .entry(cert.normalized_subject().to_vec())
            .or_default()
            .push(index);
        self.certs.push(cert);
    }

    /// Returns the number of certificates held by the source
    pub fn len(&self) -> usize {
        self.certs.len()
    }

    /// Returns true if the source holds no certificates
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// Removes all certificates from the source
    pub fn clear(&mut self) {
        self.certs.clear();
        self.name_map.clear();
    }
}

impl FromIterator<PathCert> for CertIssuerSourceStatic {
    fn from_iter<I: IntoIterator<Item = PathCert>>(iter: I) -> Self {
        let mut source = CertIssuerSourceStatic::new();
        for cert in iter {
            source.add_cert(cert);
        }
        source
    }
}

impl CertIssuerSource for CertIssuerSourceStatic {
    fn sync_get_issuers_of(&self, cert: &ParsedCertificate, issuers: &mut CertificateList) {
        if let Some(indices) = self.name_map.get(cert.normalized_issuer()) {
            debug!(
                "Found {} candidate issuers for {}",
                indices.len(),
                cert.debug_string()
            );
            for i in indices {
                issuers.push(self.certs[*i].clone());
            }
        }
    }
}
