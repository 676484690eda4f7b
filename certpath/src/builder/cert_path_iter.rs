//! Resumable depth-first search for candidate certification paths

use alloc::vec::Vec;
use core::mem;
use core::task::{Context, Poll};

use log::debug;

use crate::builder::cert_issuer_iter_path::CertIssuerIterPath;
use crate::builder::cert_issuers_iter::CertIssuersIter;
use crate::environment::path_builder_traits::{CertIssuerSource, TrustStore};
use crate::{CertificateList, PathCert};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum State {
    None,
    GetNextIssuer,
    GetNextIssuerComplete,
    ReturnAPath,
    BackTrack,
}

/// `CertPathIter` enumerates candidate paths from a target certificate to a trust anchor.
///
/// The search is depth first. Each certificate in the current path has a [`CertIssuersIter`]
/// that supplies its candidate issuers; a candidate that is trusted completes a path, a candidate
/// already in the path is skipped, and any other candidate is appended and explored in turn. When a
/// certificate's issuers are exhausted it is removed from the path. Trust anchors are never
/// appended, so issuers of trust anchors are never sought.
///
/// The search suspends only while waiting on an asynchronous issuer source and resumes from the
/// same point when polled again.
pub struct CertPathIter<'a> {
    /// Candidate produced by the last GetNextIssuer step. Initially the target itself.
    next_cert: Option<PathCert>,
    cur_path: CertIssuerIterPath,
    cert_issuer_sources: Vec<&'a dyn CertIssuerSource>,
    trust_store: &'a dyn TrustStore,
    /// Path produced by the last ReturnAPath step
    out_path: CertificateList,
    next_state: State,
}

impl<'a> CertPathIter<'a> {
    /// Creates a search rooted at `cert` using `trust_store` to recognize trust anchors.
    pub fn new(cert: PathCert, trust_store: &'a dyn TrustStore) -> Self {
        CertPathIter {
            next_cert: Some(cert),
            cur_path: CertIssuerIterPath::default(),
            cert_issuer_sources: Vec::new(),
            trust_store,
            out_path: CertificateList::new(),
            // the first step evaluates the target as though it were a candidate issuer
            next_state: State::GetNextIssuerComplete,
        }
    }

    /// Adds a source of candidate issuers. Sources are consulted in the order added.
    pub fn add_cert_issuer_source(&mut self, cert_issuer_source: &'a dyn CertIssuerSource) {
        self.cert_issuer_sources.push(cert_issuer_source);
    }

    /// `poll_next_path` returns `Ready(Some(path))` with the next candidate path, ordered from the
    /// target to a trust anchor, or `Ready(None)` once the search is exhausted. `Pending` is
    /// returned only when `allow_async` is true and an asynchronous issuer request is outstanding;
    /// the waker in `cx` is notified when it makes progress.
    pub fn poll_next_path(
        &mut self,
        cx: &mut Context<'_>,
        allow_async: bool,
    ) -> Poll<Option<CertificateList>> {
        if State::None == self.next_state {
            return Poll::Ready(None);
        }

        if self.do_loop(cx, allow_async).is_pending() {
            return Poll::Pending;
        }

        match self.next_state {
            State::ReturnAPath => Poll::Ready(Some(mem::take(&mut self.out_path))),
            _ => Poll::Ready(None),
        }
    }

    /// Runs the state machine until a path is ready, the search is exhausted, or an issuer request
    /// suspends it.
    fn do_loop(&mut self, cx: &mut Context<'_>, allow_async: bool) -> Poll<()> {
        loop {
            let state = mem::replace(&mut self.next_state, State::None);
            let rv = match state {
                State::None => Poll::Ready(()),
                State::GetNextIssuer => self.do_get_next_issuer(cx, allow_async),
                State::GetNextIssuerComplete => self.do_get_next_issuer_complete(),
                State::ReturnAPath => {
                    // the trust anchor was never appended, so carry on with the same generator
                    self.next_state = State::GetNextIssuer;
                    Poll::Ready(())
                }
                State::BackTrack => self.do_back_track(),
            };
            if rv.is_pending() {
                return Poll::Pending;
            }
            if matches!(self.next_state, State::None | State::ReturnAPath) {
                return Poll::Ready(());
            }
        }
    }

    fn do_get_next_issuer(&mut self, cx: &mut Context<'_>, allow_async: bool) -> Poll<()> {
        let cert_issuers_iter = match self.cur_path.back_mut() {
            Some(cert_issuers_iter) => cert_issuers_iter,
            None => {
                // the target was itself trusted; there is nothing more to explore
                self.next_state = State::None;
                return Poll::Ready(());
            }
        };
        match cert_issuers_iter.poll_next_issuer(&self.cert_issuer_sources, cx, allow_async) {
            Poll::Ready(cert) => {
                self.next_cert = cert;
                self.next_state = State::GetNextIssuerComplete;
                Poll::Ready(())
            }
            Poll::Pending => {
                self.next_state = State::GetNextIssuer;
                Poll::Pending
            }
        }
    }

    fn do_get_next_issuer_complete(&mut self) -> Poll<()> {
        let cert = match self.next_cert.take() {
            Some(cert) => cert,
            None => {
                self.next_state = State::BackTrack;
                return Poll::Ready(());
            }
        };

        if self.cur_path.is_present(&cert) {
            debug!(
                "CertPathIter skipping {} as it is already in the path",
                cert.debug_string()
            );
            self.next_state = State::GetNextIssuer;
        } else if self.trust_store.is_trusted_certificate(&cert) {
            debug!(
                "CertPathIter found trust anchor {} for path {}",
                cert.debug_string(),
                self.cur_path.path_debug_string()
            );
            self.out_path = self.cur_path.copy_path();
            self.out_path.push(cert);
            self.next_state = State::ReturnAPath;
        } else {
            let cert_issuers_iter =
                CertIssuersIter::new(cert, &self.cert_issuer_sources, self.trust_store);
            self.cur_path.append(cert_issuers_iter);
            debug!(
                "CertPathIter cur_path is now {}",
                self.cur_path.path_debug_string()
            );
            self.next_state = State::GetNextIssuer;
        }
        Poll::Ready(())
    }

    fn do_back_track(&mut self) -> Poll<()> {
        debug!(
            "CertPathIter backtracking from {} (depth {})",
            self.cur_path.path_debug_string(),
            self.cur_path.len()
        );
        if !self.cur_path.is_empty() {
            self.cur_path.pop();
        }
        self.next_state = if self.cur_path.is_empty() {
            debug!("CertPathIter exhausted all paths");
            State::None
        } else {
            State::GetNextIssuer
        };
        Poll::Ready(())
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

    fn all_paths(iter: &mut CertPathIter<'_>) -> Vec<CertificateList> {
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut paths = vec![];
        loop {
            match iter.poll_next_path(&mut cx, false) {
                Poll::Ready(Some(path)) => paths.push(path),
                Poll::Ready(None) => break,
                Poll::Pending => panic!("synchronous search suspended"),
            }
        }
        paths
    }

    #[test]
    fn enumerates_depth_first() {
        let target = cert(b"target", b"Target", b"Intermediate");
        let i1 = cert(b"i1", b"Intermediate", b"Root");
        let i2 = cert(b"i2", b"Intermediate", b"Root");
        let root = cert(b"root", b"Root", b"Root");

        let ts: TrustStoreInMemory = vec![root.clone()].into_iter().collect();
        let source: CertIssuerSourceStatic = vec![i1.clone(), i2.clone()].into_iter().collect();

        let mut iter = CertPathIter::new(target.clone(), &ts);
        iter.add_cert_issuer_source(&source);
        let paths = all_paths(&mut iter);
        assert_eq!(
            vec![
                vec![target.clone(), i1, root.clone()],
                vec![target, i2, root]
            ],
            paths
        );

        // exhaustion is permanent
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert_eq!(Poll::Ready(None), iter.poll_next_path(&mut cx, true));
    }

    #[test]
    fn trusted_target_yields_single_path() {
        let target = cert(b"target", b"Target", b"Target");
        let ts: TrustStoreInMemory = vec![target.clone()].into_iter().collect();
        let mut iter = CertPathIter::new(target.clone(), &ts);
        assert_eq!(vec![vec![target]], all_paths(&mut iter));
    }

    #[test]
    fn cycles_terminate() {
        let a = cert(b"a", b"A", b"B");
        let b = cert(b"b", b"B", b"A");
        let ts = TrustStoreInMemory::new();
        let source: CertIssuerSourceStatic = vec![a.clone(), b].into_iter().collect();

        let mut iter = CertPathIter::new(a, &ts);
        iter.add_cert_issuer_source(&source);
        assert!(all_paths(&mut iter).is_empty());
    }

    #[test]
    fn no_issuers() {
        let target = cert(b"target", b"Target", b"Nobody");
        let ts = TrustStoreInMemory::new();
        let mut iter = CertPathIter::new(target, &ts);
        assert!(all_paths(&mut iter).is_empty());
    }
}
