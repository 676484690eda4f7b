#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use certpath::*;
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::stream::{Stream, StreamExt};
use futures::task::noop_waker;

/// Builds a synthetic certificate. The DER encoding records the certificate's label and the key it
/// was signed with so that [`check_signature`] can compare it against the issuer's key.
pub fn cert(label: &str, subject: &str, issuer: &str, key: &str, signing_key: &str) -> PathCert {
    Arc::new(ParsedCertificate::new(
        format!("{label}|{signing_key}").into_bytes(),
        subject.as_bytes().to_vec(),
        issuer.as_bytes().to_vec(),
        vec![],
        key.as_bytes().to_vec(),
    ))
}

/// Returns a separately allocated certificate with the same DER encoding
pub fn dupe(cert: &PathCert) -> PathCert {
    Arc::new(ParsedCertificate::clone(cert))
}

pub fn check_signature(cert: &ParsedCertificate, issuer: &ParsedCertificate) -> Result<()> {
    let signing_key = cert.der_cert().split(|b| *b == b'|').last().unwrap_or_default();
    if signing_key == issuer.spki() {
        Ok(())
    } else {
        Err(Error::PathValidation(
            PathValidationStatus::SignatureVerificationFailure,
        ))
    }
}

pub const SIG_FAILURE: Result<()> = Err(Error::PathValidation(
    PathValidationStatus::SignatureVerificationFailure,
));

/// Runs the builder to completion, returning true if it finished on its first poll.
pub fn run_path_builder(builder: &mut CertPathBuilder<'_>) -> bool {
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    if builder.poll_run(&mut cx).is_ready() {
        return true;
    }
    futures::executor::block_on(builder.run());
    false
}

/// Yields its issuers only after first reporting Pending, waking the task so it is polled again.
struct DeferredIssuers {
    issuers: std::vec::IntoIter<PathCert>,
    deferred: bool,
}

impl Stream for DeferredIssuers {
    type Item = PathCert;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<PathCert>> {
        if !self.deferred {
            self.deferred = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        Poll::Ready(self.issuers.next())
    }
}

/// Supplies its certificates only asynchronously
#[derive(Default)]
pub struct AsyncCertIssuerSourceStatic {
    certs: CertIssuerSourceStatic,
    num_async_gets: Cell<usize>,
}

impl AsyncCertIssuerSourceStatic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_cert(&mut self, cert: PathCert) {
        self.certs.add_cert(cert);
    }

    pub fn num_async_gets(&self) -> usize {
        self.num_async_gets.get()
    }
}

impl CertIssuerSource for AsyncCertIssuerSourceStatic {
    fn sync_get_issuers_of(&self, _cert: &ParsedCertificate, _issuers: &mut CertificateList) {}

    fn async_get_issuers_of(&self, cert: &PathCert) -> Option<IssuerRequest> {
        self.num_async_gets.set(self.num_async_gets.get() + 1);
        let mut issuers = CertificateList::new();
        self.certs.sync_get_issuers_of(cert, &mut issuers);
        Some(
            DeferredIssuers {
                issuers: issuers.into_iter(),
                deferred: false,
            }
            .boxed(),
        )
    }
}

/// Records which lookups were made and, for one designated certificate, returns a request whose
/// results are pushed by the test through [`MockCertIssuerSource::sender`].
pub struct MockCertIssuerSource {
    target_der: Vec<u8>,
    receiver: Mutex<Option<UnboundedReceiver<PathCert>>>,
    sender: UnboundedSender<PathCert>,
    calls: RefCell<Vec<String>>,
}

impl MockCertIssuerSource {
    pub fn new(target: &PathCert) -> Self {
        let (sender, receiver) = unbounded();
        MockCertIssuerSource {
            target_der: target.der_cert().to_vec(),
            receiver: Mutex::new(Some(receiver)),
            sender,
            calls: RefCell::new(vec![]),
        }
    }

    pub fn sender(&self) -> UnboundedSender<PathCert> {
        self.sender.clone()
    }

    /// Returns and clears the lookups made so far, e.g. "sync target|key"
    pub fn take_calls(&self) -> Vec<String> {
        self.calls.take()
    }

    fn record(&self, kind: &str, cert: &ParsedCertificate) {
        self.calls.borrow_mut().push(format!(
            "{kind} {}",
            String::from_utf8_lossy(cert.der_cert())
        ));
    }
}

impl CertIssuerSource for MockCertIssuerSource {
    fn sync_get_issuers_of(&self, cert: &ParsedCertificate, _issuers: &mut CertificateList) {
        self.record("sync", cert);
    }

    fn async_get_issuers_of(&self, cert: &PathCert) -> Option<IssuerRequest> {
        self.record("async", cert);
        if cert.der_cert() != self.target_der.as_slice() {
            return None;
        }
        let receiver = self.receiver.lock().ok()?.take()?;
        Some(receiver.boxed())
    }
}

/// Sets a flag when dropped
pub struct DropFlag(pub Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// A request that never completes
struct NeverCompletes {
    _flag: DropFlag,
}

impl Stream for NeverCompletes {
    type Item = PathCert;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<PathCert>> {
        Poll::Pending
    }
}

/// Returns requests that never complete and that set `dropped` once released
pub struct NeverCompletingSource {
    pub dropped: Arc<AtomicBool>,
}

impl CertIssuerSource for NeverCompletingSource {
    fn sync_get_issuers_of(&self, _cert: &ParsedCertificate, _issuers: &mut CertificateList) {}

    fn async_get_issuers_of(&self, _cert: &PathCert) -> Option<IssuerRequest> {
        Some(
            NeverCompletes {
                _flag: DropFlag(self.dropped.clone()),
            }
            .boxed(),
        )
    }
}
