//! The path_builder_traits module features trait definitions and type definitions for the
//! collaborators consulted by [`CertPathBuilder`](crate::CertPathBuilder): the trust store, issuer
//! sources and the verifier applied to each candidate path.

use futures::stream::BoxStream;

use crate::util::error::*;
use crate::{CertificateList, ParsedCertificate, PathCert};

/// `IssuerRequest` is an outstanding asynchronous request for issuers of a certificate.
///
/// Polling the stream yields `Ready(Some(cert))` for each certificate as it becomes available,
/// `Pending` while more results may still arrive (the task waker will be notified), and
/// `Ready(None)` once the request is complete. Dropping the stream cancels the request.
pub type IssuerRequest = BoxStream<'static, PathCert>;

/// `CheckIssuerSignature` provides a function signature for implementations that verify the
/// signature of the first certificate using the public key of the second.
pub type CheckIssuerSignature = fn(
    &ParsedCertificate, // certificate whose signature is checked
    &ParsedCertificate, // issuer
) -> Result<()>;

/// The [`TrustStore`] trait enables trait objects to provide access to trust anchors backed via
/// some means, i.e., hard-coded, file-based, system store accessed via FFI, etc.
pub trait TrustStore {
    /// find_trust_anchors_by_normalized_name appends to `matches` every trust anchor whose normalized
    /// subject equals `normalized_name`.
    fn find_trust_anchors_by_normalized_name(
        &self,
        normalized_name: &[u8],
        matches: &mut CertificateList,
    );

    /// is_trusted_certificate returns true if the presented certificate is itself a trust anchor.
    fn is_trusted_certificate(&self, cert: &ParsedCertificate) -> bool;
}

/// The [`CertIssuerSource`] trait enables trait objects to supply candidate issuers for a
/// certificate, i.e., a local intermediate store or a network retriever.
pub trait CertIssuerSource {
    /// sync_get_issuers_of appends candidate issuers of `cert` that are immediately available to
    /// `issuers`, preserving the source's own ordering.
    fn sync_get_issuers_of(&self, cert: &ParsedCertificate, issuers: &mut CertificateList);

    /// async_get_issuers_of starts an asynchronous search for issuers of `cert`. Sources that only
    /// offer synchronous results, or that have nothing to contribute for `cert`, return None.
    fn async_get_issuers_of(&self, _cert: &PathCert) -> Option<IssuerRequest> {
        None
    }
}

/// The [`PathVerifier`] trait is used to evaluate candidate paths. A path is ordered from the target
/// certificate to a trust anchor. Any failure is recorded and path building moves on to the next
/// candidate.
pub trait PathVerifier {
    /// verify_path returns Ok when the path is acceptable.
    fn verify_path(&self, path: &[PathCert]) -> Result<()>;
}

impl<F> PathVerifier for F
where
    F: Fn(&[PathCert]) -> Result<()>,
{
    fn verify_path(&self, path: &[PathCert]) -> Result<()> {
        self(path)
    }
}
