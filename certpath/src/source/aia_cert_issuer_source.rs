//! Provides an asynchronous issuer source that retrieves certificates from the caIssuers URIs found
//! in authority information access extensions

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use std::sync::Mutex;

use cms::{content_info::ContentInfo, signed_data::SignedData};
use der::{Decode, Encode};
use futures::stream::{self, StreamExt};
use log::{debug, error, info};

use crate::environment::path_builder_traits::{CertIssuerSource, IssuerRequest};
use crate::util::error::*;
use crate::{CertificateList, CertificationPathSettings, ParsedCertificate, PathCert};

/// [`AiaCertIssuerSource`] offers asynchronous results only. For a certificate that carries HTTP
/// caIssuers URIs, each URI is fetched in turn and every certificate found in the response (either a
/// single DER encoded certificate or a certs-only PKCS #7 bundle) is delivered as a candidate issuer.
///
/// URIs that fail are added to a blocklist shared by all clones of the source and are not tried
/// again. Dropping the returned [`IssuerRequest`] abandons any fetch in progress.
///
/// Requests must be polled from within a tokio runtime, as required by `reqwest`.
#[derive(Clone)]
pub struct AiaCertIssuerSource {
    client: reqwest::Client,
    blocklist: Arc<Mutex<Vec<String>>>,
}

impl AiaCertIssuerSource {
    /// Creates a source using the PS_AIA_TIMEOUT and PS_URI_BLOCKLIST values from `cps`.
    pub fn new(cps: &CertificationPathSettings) -> Result<Self> {
        let client = match reqwest::Client::builder()
            .timeout(cps.get_aia_timeout())
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to prepare HTTP client: {}", e);
                return Err(Error::NetworkError);
            }
        };
        Ok(AiaCertIssuerSource {
            client,
            blocklist: Arc::new(Mutex::new(cps.get_uri_blocklist().unwrap_or_default())),
        })
    }

    /// Returns a copy of the current blocklist
    pub fn blocklist(&self) -> Vec<String> {
        match self.blocklist.lock() {
            Ok(g) => g.clone(),
            Err(_e) => Vec::new(),
        }
    }
}

fn is_blocklisted(blocklist: &Mutex<Vec<String>>, uri: &str) -> bool {
    match blocklist.lock() {
        Ok(g) => g.iter().any(|u| u == uri),
        Err(_e) => false,
    }
}

fn add_to_blocklist(blocklist: &Mutex<Vec<String>>, uri: &str) {
    if let Ok(mut g) = blocklist.lock() {
        if !g.iter().any(|u| u == uri) {
            g.push(uri.to_string());
        }
    }
}

/// `certs_from_buffer` parses the presented buffer as a certificate or, failing that, as a certs-only
/// SignedData message and returns whatever certificates it contains.
pub(crate) fn certs_from_buffer(bytes: &[u8], target: &str) -> CertificateList {
    if let Ok(cert) = ParsedCertificate::from_der(bytes) {
        return alloc::vec![Arc::new(cert)];
    }

    let mut certs = CertificateList::new();
    let ci = match ContentInfo::from_der(bytes) {
        Ok(ci) => ci,
        Err(e) => {
            error!("Failed to parse response from {} with {:?}", target, e);
            return certs;
        }
    };
    let content = match ci.content.to_der() {
        Ok(content) => content,
        Err(_e) => return certs,
    };
    match SignedData::from_der(content.as_slice()) {
        Ok(sd) => {
            for c in sd.certificates.iter() {
                for a in c.0.iter() {
                    if let Ok(enc_cert) = a.to_der() {
                        match ParsedCertificate::from_der(&enc_cert) {
                            Ok(cert) => certs.push(Arc::new(cert)),
                            Err(e) => debug!("Ignoring certificate from {}: {}", target, e),
                        }
                    }
                }
            }
        }
        Err(e) => {
            error!("Failed to parse SignedData from {} with {:?}", target, e);
        }
    }
    certs
}

async fn fetch_issuers(
    client: reqwest::Client,
    blocklist: Arc<Mutex<Vec<String>>>,
    target: String,
) -> CertificateList {
    if is_blocklisted(&blocklist, &target) {
        error!("Skipping due to blocklist: {}", target);
        return CertificateList::new();
    }
    info!("Downloading {}", target);

    let response = match client.get(&target).send().await {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to process {} with {:?}", target, e);
            add_to_blocklist(&blocklist, &target);
            return CertificateList::new();
        }
    };

    // some things "succeed" when handing us an HTML page with an error. skip those.
    let is_html = response
        .headers()
        .get("Content-Type")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.starts_with("text/html"))
        .unwrap_or(false);
    if !response.status().is_success() || is_html {
        error!(
            "Unexpected response from {}: {}",
            target,
            response.status()
        );
        add_to_blocklist(&blocklist, &target);
        return CertificateList::new();
    }

    match response.bytes().await {
        Ok(bytes) => {
            debug!("Downloaded buffer {}", target);
            let certs = certs_from_buffer(bytes.as_ref(), &target);
            if certs.is_empty() {
                add_to_blocklist(&blocklist, &target);
            }
            certs
        }
        Err(e) => {
            error!("Failed to read response from {} with {:?}", target, e);
            add_to_blocklist(&blocklist, &target);
            CertificateList::new()
        }
    }
}

impl CertIssuerSource for AiaCertIssuerSource {
    fn sync_get_issuers_of(&self, _cert: &ParsedCertificate, _issuers: &mut CertificateList) {}

    fn async_get_issuers_of(&self, cert: &PathCert) -> Option<IssuerRequest> {
        let uris: Vec<String> = cert
            .ca_issuers_uris()
            .iter()
            .filter(|uri| !is_blocklisted(&self.blocklist, uri))
            .cloned()
            .collect();
        if uris.is_empty() {
            return None;
        }

        debug!(
            "Requesting issuers of {} from {} URIs",
            cert.debug_string(),
            uris.len()
        );
        let client = self.client.clone();
        let blocklist = self.blocklist.clone();
        Some(
            stream::iter(uris)
                .then(move |uri| fetch_issuers(client.clone(), blocklist.clone(), uri))
                .flat_map(stream::iter)
                .boxed(),
        )
    }
}
