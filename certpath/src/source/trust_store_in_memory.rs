//! Provides implementation of a manually populated in-memory trust store. The following snip
//! illustrates preparation and use of a [`TrustStoreInMemory`] object.
//!
//! ```
//! use std::sync::Arc;
//! use certpath::{ParsedCertificate, TrustStore, TrustStoreInMemory};
//!
//! let root = Arc::new(ParsedCertificate::new(
//!     b"root".to_vec(),
//!     b"CN=Root".to_vec(),
//!     b"CN=Root".to_vec(),
//!     vec![],
//!     b"root key".to_vec(),
//! ));
//!
//! let mut trust_store = TrustStoreInMemory::default();
//! trust_store.add_trust_anchor(root.clone());
//! assert!(trust_store.is_trusted_certificate(&root));
//! ```

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use log::debug;

use crate::environment::path_builder_traits::TrustStore;
use crate::{CertificateList, ParsedCertificate, PathCert};

/// [`TrustStoreInMemory`] holds trust anchors in memory, indexed by normalized subject name.
///
/// A certificate is considered trusted when the store holds an anchor with the same normalized
/// subject name and SubjectPublicKeyInfo, i.e., a re-issued root certificate carrying the same name
/// and key as a trusted root is itself trusted.
#[derive(Clone, Default)]
pub struct TrustStoreInMemory {
    /// Trust anchors in the order they were added
    tas: CertificateList,

    /// Maps normalized subject names to indices into tas
    name_map: BTreeMap<Vec<u8>, Vec<usize>>,
}

impl TrustStoreInMemory {
    /// Creates an empty store
    pub fn new() -> TrustStoreInMemory {
        TrustStoreInMemory::default()
    }

    /// add_trust_anchor adds the presented certificate as a trust anchor. Adding a certificate with
    /// the same DER encoding as an existing anchor has no effect.
    pub fn add_trust_anchor(&mut self, ta: PathCert) {
        if self.tas.iter().any(|c| c.der_cert() == ta.der_cert()) {
            return;
        }
        debug!("Adding trust anchor {}", ta.debug_string());
        let index = self.tas.len();
        self.name_map
            .entry(ta.normalized_subject().to_vec())
            .or_default()
            .push(index);
        self.tas.push(ta);
    }

    /// Returns the number of trust anchors in the store
    pub fn len(&self) -> usize {
        self.tas.len()
    }

    /// Returns true if the store holds no trust anchors
    pub fn is_empty(&self) -> bool {
        self.tas.is_empty()
    }

    /// Removes all trust anchors from the store
    pub fn clear(&mut self) {
        self.tas.clear();
        self.name_map.clear();
    }
}

impl FromIterator<PathCert> for TrustStoreInMemory {
    fn from_iter<I: IntoIterator<Item = PathCert>>(iter: I) -> Self {
        let mut store = TrustStoreInMemory::new();
        for ta in iter {
            store.add_trust_anchor(ta);
        }
        store
    }
}

impl TrustStore for TrustStoreInMemory {
    fn find_trust_anchors_by_normalized_name(
        &self,
        normalized_name: &[u8],
        matches: &mut CertificateList,
    ) {
        if let Some(indices) = self.name_map.get(normalized_name) {
            for i in indices {
                matches.push(self.tas[*i].clone());
            }
        }
    }

    fn is_trusted_certificate(&self, cert: &ParsedCertificate) -> bool {
        match self.name_map.get(cert.normalized_subject()) {
            Some(indices) => indices.iter().any(|i| self.tas[*i].spki() == cert.spki()),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use alloc::vec;

    fn cert(der: &[u8], subject: &[u8], issuer: &[u8], spki: &[u8]) -> PathCert {
        Arc::new(ParsedCertificate::new(
            der.to_vec(),
            subject.to_vec(),
            issuer.to_vec(),
            vec![],
            spki.to_vec(),
        ))
    }

    #[test]
    fn trust_store_lookups() {
        let root = cert(b"root", b"Root", b"Root", b"root key");
        let rollover = cert(b"rollover", b"Root", b"Old Root", b"root key");
        let other_key = cert(b"other", b"Root", b"Root", b"other key");
        let intermediate = cert(b"intermediate", b"Intermediate", b"Root", b"int key");

        let mut ts = TrustStoreInMemory::new();
        assert!(ts.is_empty());
        ts.add_trust_anchor(root.clone());
        ts.add_trust_anchor(root.clone());
        assert_eq!(1, ts.len());

        assert!(ts.is_trusted_certificate(&root));
        // same name and key, different encoding
        assert!(ts.is_trusted_certificate(&rollover));
        assert!(!ts.is_trusted_certificate(&other_key));
        assert!(!ts.is_trusted_certificate(&intermediate));

        let mut matches = vec![];
        ts.find_trust_anchors_by_normalized_name(intermediate.normalized_issuer(), &mut matches);
        assert_eq!(1, matches.len());
        assert_eq!(root, matches[0]);

        matches.clear();
        ts.find_trust_anchors_by_normalized_name(b"Nobody", &mut matches);
        assert!(matches.is_empty());

        ts.clear();
        assert!(!ts.is_trusted_certificate(&root));
    }

    #[test]
    fn from_iter_preserves_order() {
        let a = cert(b"a", b"Root", b"Root", b"a key");
        let b = cert(b"b", b"Root", b"Root", b"b key");
        let ts: TrustStoreInMemory = vec![a.clone(), b.clone()].into_iter().collect();
        let mut matches = vec![];
        ts.find_trust_anchors_by_normalized_name(b"Root", &mut matches);
        assert_eq!(vec![a, b], matches);
    }
}
