use super::index::resolve_url;
use crate::core::{RudderError, RudderResult};
use crate::di::ArtifactFetcher;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP fetcher for catalog documents and chart archives
///
/// Every request is bounded by the configured timeout.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> RudderResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rudder/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> RudderResult<Vec<u8>> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RudderError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(RudderError::Transient(format!("GET {} returned {}", url, status)));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Hex SHA-256 of `data`
pub fn digest_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Fetch the first candidate URL that answers with the expected digest.
///
/// Relative URLs are resolved against `base`. Failed fetches and digest
/// mismatches move on to the next candidate.
pub async fn fetch_first(
    fetcher: &dyn ArtifactFetcher,
    base: &str,
    urls: &[String],
    digest: Option<&str>,
) -> RudderResult<Vec<u8>> {
    let mut last_error = None;
    for url in urls {
        let url = resolve_url(base, url);
        match fetcher.fetch(&url).await {
            Ok(data) => match digest {
                Some(expected) if !expected.eq_ignore_ascii_case(&digest_hex(&data)) => {
                    warn!("Digest mismatch for {}", url);
                    last_error = Some(RudderError::Validation(format!(
                        "digest mismatch for {}",
                        url
                    )));
                }
                _ => return Ok(data),
            },
            Err(e) => {
                debug!("Candidate {} failed: {}", url, e);
                last_error = Some(e.context(format!("GET {}", url)));
            }
        }
    }
    Err(match last_error {
        Some(e) => e.context(format!("all {} candidate url(s) failed", urls.len())),
        None => RudderError::Validation("no download urls".to_string()),
    })
}
