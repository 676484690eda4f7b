//! Generator of candidate issuers for a single certificate

use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::task::{Context, Poll};

use futures::StreamExt;
use log::debug;

use crate::environment::path_builder_traits::{CertIssuerSource, IssuerRequest, TrustStore};
use crate::{CertificateList, PathCert};

/// `CertIssuersIter` produces a de-duplicated sequence of candidate issuers for one certificate.
///
/// Candidates are yielded in three tiers: trust anchors whose subject matches the certificate's
/// issuer name, then issuers offered synchronously by each source in source order, then issuers
/// delivered asynchronously, in the order they arrive. A given DER encoding is yielded at most once.
pub(crate) struct CertIssuersIter {
    /// The certificate whose issuers are being generated
    cert: PathCert,

    /// Candidate issuers discovered so far, in yield order
    issuers: CertificateList,

    /// Index of the next candidate in issuers to yield
    cur_issuer: usize,

    /// DER encodings of every candidate in issuers
    present_issuers: BTreeSet<Vec<u8>>,

    /// Set once async sources have been asked for issuers of cert
    did_async_issuer_query: bool,

    /// Outstanding asynchronous requests. A request is dropped, and so cancelled, once complete.
    pending_async_requests: Vec<IssuerRequest>,

    /// Set once the generator has reported that no issuers remain
    exhausted: bool,
}

impl CertIssuersIter {
    /// Creates a generator for `cert`, seeding it with matching trust anchors and with every issuer
    /// the sources can supply synchronously.
    pub(crate) fn new(
        cert: PathCert,
        cert_issuer_sources: &[&dyn CertIssuerSource],
        trust_store: &dyn TrustStore,
    ) -> Self {
        let mut iter = CertIssuersIter {
            cert,
            issuers: CertificateList::new(),
            cur_issuer: 0,
            present_issuers: BTreeSet::new(),
            did_async_issuer_query: false,
            pending_async_requests: Vec::new(),
            exhausted: false,
        };
        debug!("CertIssuersIter created for {}", iter.cert.debug_string());

        let mut anchors = CertificateList::new();
        trust_store.find_trust_anchors_by_normalized_name(iter.cert.normalized_issuer(), &mut anchors);
        iter.add_issuers(anchors);

        for source in cert_issuer_sources {
            let mut new_issuers = CertificateList::new();
            source.sync_get_issuers_of(&iter.cert, &mut new_issuers);
            iter.add_issuers(new_issuers);
        }
        debug!(
            "{} has {} candidate issuers available synchronously",
            iter.cert.debug_string(),
            iter.issuers.len()
        );
        iter
    }

    /// The certificate whose issuers are being generated
    pub(crate) fn cert(&self) -> &PathCert {
        &self.cert
    }

    /// `poll_next_issuer` returns `Ready(Some(issuer))` for the next candidate, `Ready(None)` once
    /// no candidates remain, or `Pending` while waiting on asynchronous sources, in which case the
    /// waker in `cx` is notified when a request makes progress.
    ///
    /// When `allow_async` is false, asynchronous sources are never consulted and the generator is
    /// exhausted as soon as the synchronously available candidates have been yielded.
    ///
    /// Polling again after `Ready(None)` has been returned is a programming error.
    pub(crate) fn poll_next_issuer(
        &mut self,
        cert_issuer_sources: &[&dyn CertIssuerSource],
        cx: &mut Context<'_>,
        allow_async: bool,
    ) -> Poll<Option<PathCert>> {
        assert!(
            !self.exhausted,
            "poll_next_issuer called on an exhausted CertIssuersIter"
        );

        if self.did_async_issuer_query {
            self.poll_async_requests(cx);
        }

        if let Some(issuer) = self.take_next_issuer() {
            return Poll::Ready(Some(issuer));
        }

        if !self.did_async_issuer_query {
            if !allow_async {
                return self.finish();
            }

            self.did_async_issuer_query = true;
            for source in cert_issuer_sources {
                if let Some(request) = source.async_get_issuers_of(&self.cert) {
                    self.pending_async_requests.push(request);
                }
            }
            debug!(
                "Issued {} async requests for issuers of {}",
                self.pending_async_requests.len(),
                self.cert.debug_string()
            );
            if self.pending_async_requests.is_empty() {
                return self.finish();
            }

            // results that are already available are picked up here and the waker is registered
            // with every request that is still outstanding
            self.poll_async_requests(cx);
            if let Some(issuer) = self.take_next_issuer() {
                return Poll::Ready(Some(issuer));
            }
        }

        if self.pending_async_requests.is_empty() {
            self.finish()
        } else {
            Poll::Pending
        }
    }

    /// Returns the next not-yet-yielded candidate, if any, advancing the cursor.
    fn take_next_issuer(&mut self) -> Option<PathCert> {
        let issuer = self.issuers.get(self.cur_issuer)?.clone();
        self.cur_issuer += 1;
        debug!(
            "CertIssuersIter for {} returning issuer {} of {}: {}",
            self.cert.debug_string(),
            self.cur_issuer,
            self.issuers.len(),
            issuer.debug_string()
        );
        Some(issuer)
    }

    fn finish(&mut self) -> Poll<Option<PathCert>> {
        debug!(
            "CertIssuersIter for {} reached the end of all available issuers",
            self.cert.debug_string()
        );
        self.exhausted = true;
        Poll::Ready(None)
    }

    /// Drains every outstanding request of whatever it can deliver right now. Completed requests
    /// are dropped; the remainder have registered the waker in `cx`.
    fn poll_async_requests(&mut self, cx: &mut Context<'_>) {
        let mut i = 0;
        while i < self.pending_async_requests.len() {
            match self.pending_async_requests[i].poll_next_unpin(cx) {
                Poll::Ready(Some(issuer)) => self.add_issuer(issuer),
                Poll::Ready(None) => {
                    self.pending_async_requests.remove(i);
                    debug!(
                        "Async request for issuers of {} complete, {} remain pending",
                        self.cert.debug_string(),
                        self.pending_async_requests.len()
                    );
                }
                Poll::Pending => i += 1,
            }
        }
    }

    fn add_issuers(&mut self, new_issuers: CertificateList) {
        for issuer in new_issuers {
            self.add_issuer(issuer);
        }
    }

    fn add_issuer(&mut self, issuer: PathCert) {
        if self.present_issuers.insert(issuer.der_cert().to_vec()) {
            self.issuers.push(issuer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::cert_issuer_source_static::CertIssuerSourceStatic;
    use crate::source::trust_store_in_memory::TrustStoreInMemory;
    use crate::ParsedCertificate;
    use alloc::sync::Arc;
    use alloc::vec;
    use futures::channel::mpsc;
    use futures::task::noop_waker;

    fn cert(der: &[u8], subject: &[u8], issuer: &[u8]) -> PathCert {
        Arc::new(ParsedCertificate::new(
            der.to_vec(),
            subject.to_vec(),
            issuer.to_vec(),
            vec![],
            der.to_vec(),
        ))
    }

    /// Hands out one channel receiver per call, in order, for certificates issued by "Issuer".
    struct ChannelSource {
        receivers: core::cell::RefCell<Vec<mpsc::UnboundedReceiver<PathCert>>>,
    }

    impl CertIssuerSource for ChannelSource {
        fn sync_get_issuers_of(&self, _cert: &ParsedCertificate, _issuers: &mut CertificateList) {}

        fn async_get_issuers_of(&self, _cert: &PathCert) -> Option<IssuerRequest> {
            let mut receivers = self.receivers.borrow_mut();
            if receivers.is_empty() {
                None
            } else {
                Some(receivers.remove(0).boxed())
            }
        }
    }

    fn next(
        iter: &mut CertIssuersIter,
        sources: &[&dyn CertIssuerSource],
        allow_async: bool,
    ) -> Poll<Option<PathCert>> {
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        iter.poll_next_issuer(sources, &mut cx, allow_async)
    }

    #[test]
    fn anchors_precede_sync_issuers_and_duplicates_are_dropped() {
        let target = cert(b"target", b"Target", b"Issuer");
        let anchor = cert(b"anchor", b"Issuer", b"Issuer");
        let intermediate = cert(b"intermediate", b"Issuer", b"Root");

        let ts: TrustStoreInMemory = vec![anchor.clone()].into_iter().collect();
        let source1: CertIssuerSourceStatic = vec![intermediate.clone(), anchor.clone()]
            .into_iter()
            .collect();
        let source2: CertIssuerSourceStatic = vec![intermediate.clone()].into_iter().collect();
        let sources: Vec<&dyn CertIssuerSource> = vec![&source1, &source2];

        let mut iter = CertIssuersIter::new(target.clone(), &sources, &ts);
        assert_eq!(&target, iter.cert());
        assert_eq!(Poll::Ready(Some(anchor)), next(&mut iter, &sources, true));
        assert_eq!(Poll::Ready(Some(intermediate)), next(&mut iter, &sources, true));
        assert_eq!(Poll::Ready(None), next(&mut iter, &sources, true));
    }

    #[test]
    fn async_results_merge_in_arrival_order() {
        let target = cert(b"target", b"Target", b"Issuer");
        let i1 = cert(b"i1", b"Issuer", b"Root");
        let i2 = cert(b"i2", b"Issuer", b"Root");

        let (tx1, rx1) = mpsc::unbounded();
        let (tx2, rx2) = mpsc::unbounded();
        let source = ChannelSource {
            receivers: core::cell::RefCell::new(vec![rx1, rx2]),
        };
        let second = ChannelSource {
            receivers: core::cell::RefCell::new(vec![]),
        };
        let sources: Vec<&dyn CertIssuerSource> = vec![&source, &source, &second];
        let ts = TrustStoreInMemory::new();

        let mut iter = CertIssuersIter::new(target, &sources, &ts);
        assert_eq!(Poll::Pending, next(&mut iter, &sources, true));
        assert_eq!(2, iter.pending_async_requests.len());

        // the second request completes first
        tx2.unbounded_send(i2.clone()).unwrap();
        tx2.unbounded_send(i1.clone()).unwrap();
        drop(tx2);
        assert_eq!(Poll::Ready(Some(i2.clone())), next(&mut iter, &sources, true));
        assert_eq!(Poll::Ready(Some(i1.clone())), next(&mut iter, &sources, true));
        assert_eq!(1, iter.pending_async_requests.len());
        assert_eq!(Poll::Pending, next(&mut iter, &sources, true));

        // duplicates delivered by the first request are dropped
        tx1.unbounded_send(i1).unwrap();
        tx1.unbounded_send(i2).unwrap();
        assert_eq!(Poll::Pending, next(&mut iter, &sources, true));
        drop(tx1);
        assert_eq!(Poll::Ready(None), next(&mut iter, &sources, true));
    }

    #[test]
    fn sync_only_mode_never_queries_async_sources() {
        let target = cert(b"target", b"Target", b"Issuer");
        let (_tx, rx) = mpsc::unbounded();
        let source = ChannelSource {
            receivers: core::cell::RefCell::new(vec![rx]),
        };
        let sources: Vec<&dyn CertIssuerSource> = vec![&source];
        let ts = TrustStoreInMemory::new();

        let mut iter = CertIssuersIter::new(target, &sources, &ts);
        assert_eq!(Poll::Ready(None), next(&mut iter, &sources, false));
        assert_eq!(1, source.receivers.borrow().len());
    }

    #[test]
    fn no_async_requests_issued() {
        let target = cert(b"target", b"Target", b"Issuer");
        let source = CertIssuerSourceStatic::new();
        let sources: Vec<&dyn CertIssuerSource> = vec![&source];
        let ts = TrustStoreInMemory::new();

        let mut iter = CertIssuersIter::new(target, &sources, &ts);
        assert_eq!(Poll::Ready(None), next(&mut iter, &sources, true));
    }

    #[test]
    #[should_panic]
    fn polling_exhausted_generator_panics() {
        let target = cert(b"target", b"Target", b"Issuer");
        let sources: Vec<&dyn CertIssuerSource> = vec![];
        let ts = TrustStoreInMemory::new();

        let mut iter = CertIssuersIter::new(target, &sources, &ts);
        assert_eq!(Poll::Ready(None), next(&mut iter, &sources, true));
        let _ = next(&mut iter, &sources, true);
    }
}
