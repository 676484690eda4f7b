//! Drives path discovery and verification to completion

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::mem;
use core::task::{Context, Poll};

use futures::future::poll_fn;
use futures::task::noop_waker_ref;
use log::debug;

use crate::builder::cert_path_iter::CertPathIter;
use crate::builder::path_results::CertPathBuilderResult;
use crate::environment::path_builder_traits::{CertIssuerSource, PathVerifier, TrustStore};
use crate::{CertificateList, CertificationPathSettings, PathCert};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum State {
    None,
    GetNextPath,
    GetNextPathComplete,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum RunState {
    NotStarted,
    Running { allow_async: bool },
    Done,
}

/// `CertPathBuilder` searches for a certification path from a target certificate to a trust anchor.
///
/// Candidate paths are produced by a [`CertPathIter`] and handed, in discovery order, to a
/// [`PathVerifier`]. Every candidate and its outcome is recorded in a [`CertPathBuilderResult`]. The
/// first candidate that verifies ends the search.
///
/// The trust store, issuer sources and verifier are borrowed for the lifetime of the builder and
/// are never modified. Dropping the builder drops every outstanding asynchronous issuer request.
///
/// ```
/// use std::sync::Arc;
/// use certpath::*;
///
/// fn cert(der: &[u8], subject: &[u8], issuer: &[u8]) -> PathCert {
///     Arc::new(ParsedCertificate::new(
///         der.to_vec(),
///         subject.to_vec(),
///         issuer.to_vec(),
///         vec![],
///         der.to_vec(),
///     ))
/// }
///
/// let target = cert(b"target", b"Target", b"Intermediate");
/// let intermediate = cert(b"intermediate", b"Intermediate", b"Root");
/// let root = cert(b"root", b"Root", b"Root");
///
/// let trust_store: TrustStoreInMemory = vec![root.clone()].into_iter().collect();
/// let intermediates: CertIssuerSourceStatic = vec![intermediate.clone()].into_iter().collect();
/// let verifier = |_path: &[PathCert]| -> Result<()> { Ok(()) };
///
/// let mut builder = CertPathBuilder::new(target.clone(), &trust_store, &verifier);
/// builder.add_cert_issuer_source(&intermediates);
/// let result = builder.run_sync();
/// assert_eq!(Some(0), result.best_result_index);
/// assert_eq!(vec![target, intermediate, root], result.paths[0].path);
/// ```
pub struct CertPathBuilder<'a> {
    cert_path_iter: CertPathIter<'a>,
    verifier: &'a dyn PathVerifier,
    /// Candidate produced by the last GetNextPath step
    next_path: Option<CertificateList>,
    next_state: State,
    run_state: RunState,
    /// Zero means no limit
    max_path_attempts: u64,
    out_result: CertPathBuilderResult,
}

impl<'a> CertPathBuilder<'a> {
    /// Creates a builder that searches for paths from `cert` to a trust anchor in `trust_store`,
    /// applying `verifier` to each candidate.
    pub fn new(
        cert: PathCert,
        trust_store: &'a dyn TrustStore,
        verifier: &'a dyn PathVerifier,
    ) -> Self {
        CertPathBuilder {
            cert_path_iter: CertPathIter::new(cert, trust_store),
            verifier,
            next_path: None,
            next_state: State::None,
            run_state: RunState::NotStarted,
            max_path_attempts: 0,
            out_result: CertPathBuilderResult::default(),
        }
    }

    /// Creates a builder as with [`CertPathBuilder::new`], applying the PS_MAX_PATH_ATTEMPTS value
    /// from `cps`.
    pub fn new_with_settings(
        cert: PathCert,
        trust_store: &'a dyn TrustStore,
        verifier: &'a dyn PathVerifier,
        cps: &CertificationPathSettings,
    ) -> Self {
        let mut builder = CertPathBuilder::new(cert, trust_store, verifier);
        builder.set_max_path_attempts(cps.get_max_path_attempts());
        builder
    }

    /// Adds a source of candidate issuers. Sources are consulted in the order added. Must not be
    /// called once the builder has started running.
    pub fn add_cert_issuer_source(&mut self, cert_issuer_source: &'a dyn CertIssuerSource) {
        assert_eq!(
            RunState::NotStarted,
            self.run_state,
            "issuer sources must be added before running"
        );
        self.cert_path_iter
            .add_cert_issuer_source(cert_issuer_source);
    }

    /// Bounds the number of candidate paths that will be verified. Zero, the default, imposes no
    /// bound. Once the bound is reached the run completes as though no further paths exist.
    pub fn set_max_path_attempts(&mut self, max_path_attempts: u64) {
        self.max_path_attempts = max_path_attempts;
    }

    /// `poll_run` advances the search, consulting asynchronous issuer sources as needed. It returns
    /// `Ready` once a path has verified or no candidates remain, after which [`result`](Self::result)
    /// is final and further calls return `Ready` immediately. `Pending` is returned while an
    /// asynchronous issuer request is outstanding; the waker in `cx` is notified when it makes
    /// progress.
    pub fn poll_run(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        self.poll_run_internal(cx, true)
    }

    /// `run` searches for a path, consulting asynchronous issuer sources as needed, and returns the
    /// accumulated result. A run that needs no asynchronous results completes on its first poll.
    ///
    /// Dropping the returned future before completion leaves the search suspended; a later call to
    /// `run` or [`poll_run`](Self::poll_run) resumes it.
    pub async fn run(&mut self) -> &CertPathBuilderResult {
        poll_fn(|cx| self.poll_run(cx)).await;
        &self.out_result
    }

    /// `run_sync` searches for a path without consulting asynchronous issuer sources and returns
    /// the accumulated result. It must not be called once an asynchronous run has started.
    pub fn run_sync(&mut self) -> &CertPathBuilderResult {
        let mut cx = Context::from_waker(noop_waker_ref());
        if self.poll_run_internal(&mut cx, false).is_pending() {
            unreachable!("synchronous path building suspended");
        }
        &self.out_result
    }

    /// The result accumulated so far
    pub fn result(&self) -> &CertPathBuilderResult {
        &self.out_result
    }

    /// Consumes the builder, returning the accumulated result
    pub fn into_result(self) -> CertPathBuilderResult {
        self.out_result
    }

    fn poll_run_internal(&mut self, cx: &mut Context<'_>, allow_async: bool) -> Poll<()> {
        match self.run_state {
            RunState::Done => return Poll::Ready(()),
            RunState::NotStarted => {
                self.run_state = RunState::Running { allow_async };
                self.next_state = State::GetNextPath;
            }
            RunState::Running {
                allow_async: running_async,
            } => {
                assert_eq!(
                    running_async, allow_async,
                    "path building resumed in a different mode"
                );
            }
        }

        if self.do_loop(cx, allow_async).is_pending() {
            return Poll::Pending;
        }
        self.run_state = RunState::Done;
        debug!(
            "CertPathBuilder finished after {} attempts, best result index {:?}",
            self.out_result.paths.len(),
            self.out_result.best_result_index
        );
        Poll::Ready(())
    }

    fn do_loop(&mut self, cx: &mut Context<'_>, allow_async: bool) -> Poll<()> {
        loop {
            let state = mem::replace(&mut self.next_state, State::None);
            let rv = match state {
                State::None => Poll::Ready(()),
                State::GetNextPath => self.do_get_next_path(cx, allow_async),
                State::GetNextPathComplete => self.do_get_next_path_complete(),
            };
            if rv.is_pending() {
                return Poll::Pending;
            }
            if State::None == self.next_state {
                return Poll::Ready(());
            }
        }
    }

    fn do_get_next_path(&mut self, cx: &mut Context<'_>, allow_async: bool) -> Poll<()> {
        match self.cert_path_iter.poll_next_path(cx, allow_async) {
            Poll::Ready(path) => {
                self.next_path = path;
                self.next_state = State::GetNextPathComplete;
                Poll::Ready(())
            }
            Poll::Pending => {
                self.next_state = State::GetNextPath;
                Poll::Pending
            }
        }
    }

    fn do_get_next_path_complete(&mut self) -> Poll<()> {
        let path = match self.next_path.take() {
            Some(path) => path,
            None => {
                debug!("CertPathBuilder has no more paths to try");
                self.next_state = State::None;
                return Poll::Ready(());
            }
        };

        let outcome = self.verifier.verify_path(&path);
        debug!(
            "CertPathBuilder verified path [{}]: {}",
            path.iter()
                .map(|c| c.debug_string())
                .collect::<Vec<_>>()
                .join(", "),
            match &outcome {
                Ok(()) => String::from("success"),
                Err(e) => format!("{}", e),
            }
        );
        let is_success = outcome.is_ok();
        self.out_result.add_result_path(path, outcome);

        let attempts_exhausted = self.max_path_attempts != 0
            && self.out_result.paths.len() as u64 >= self.max_path_attempts;
        self.next_state = if is_success {
            State::None
        } else if attempts_exhausted {
            debug!(
                "CertPathBuilder giving up after {} attempts",
                self.max_path_attempts
            );
            State::None
        } else {
            State::GetNextPath
        };
        Poll::Ready(())
    }
}
