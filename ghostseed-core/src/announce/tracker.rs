//! HTTP tracker announce delivery with tier failover

use std::io::Read;

use async_trait::async_trait;
use flate2::read::GzDecoder;

use crate::bencode::{self, BencodeValue};
use crate::config::SpoofConfig;
use crate::{Result, SpoofError};

/// Announce response fields the session cares about.
///
/// `interval_secs` is already resolved: "min interval" preferred,
/// "interval" as fallback, the configured default when the tracker reports
/// a non-positive value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerResponse {
    /// Seconds until the next announce should be sent
    pub interval_secs: u64,
    /// Seeders in the swarm, from the optional `complete` field
    pub seeders: u64,
    /// Leechers in the swarm, from the optional `incomplete` field
    pub leechers: u64,
}

/// Transport used to deliver one announce GET and return the raw body.
///
/// The HTTP implementation is the only one used at runtime; tests inject
/// scripted transports to exercise the failover walk without a network.
#[async_trait]
pub trait AnnounceTransport: Send + Sync {
    /// Fetches `url` and returns the response body bytes.
    ///
    /// # Errors
    /// - `SpoofError::TrackerRequestFailed` - Network error, bad status, or
    ///   empty body
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// reqwest-backed announce transport.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &SpoofConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(config.network.tracker_timeout)
                .user_agent(config.client.user_agent)
                .redirect(reqwest::redirect::Policy::limited(3))
                .build()
                .expect("HTTP client creation should not fail"),
        }
    }
}

#[async_trait]
impl AnnounceTransport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let failed = |reason: String| SpoofError::TrackerRequestFailed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_ENCODING, "gzip")
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("status {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| failed(format!("failed to read response body: {e}")))?;
        if body.is_empty() {
            return Err(failed("empty response body".to_string()));
        }

        Ok(body.to_vec())
    }
}

/// Delivers announces across tracker tiers in order.
///
/// Within a tier, URLs are tried in order; the first successful response is
/// authoritative. Transport failures and undecodable bodies advance to the
/// next URL; only total exhaustion surfaces, carrying the last error.
pub struct AnnounceClient {
    tiers: Vec<Vec<String>>,
    default_interval_secs: u64,
    transport: Box<dyn AnnounceTransport>,
}

impl AnnounceClient {
    pub fn new(tiers: Vec<Vec<String>>, config: &SpoofConfig) -> Self {
        Self::with_transport(tiers, config, Box::new(HttpTransport::new(config)))
    }

    pub fn with_transport(
        tiers: Vec<Vec<String>>,
        config: &SpoofConfig,
        transport: Box<dyn AnnounceTransport>,
    ) -> Self {
        Self {
            tiers,
            default_interval_secs: config.network.default_announce_interval.as_secs(),
            transport,
        }
    }

    /// Sends `query` to the first reachable tracker.
    ///
    /// # Errors
    /// - `SpoofError::TrackerUnreachable` - Every URL in every tier failed
    /// - `SpoofError::ProtocolViolation` - A tracker answered without any
    ///   interval field; failover stops, since the tracker did respond
    pub async fn announce(&self, query: &str) -> Result<TrackerResponse> {
        let mut attempts = 0;
        let mut last_error = None;

        for tier in &self.tiers {
            for base_url in tier {
                attempts += 1;
                match self.attempt(base_url, query).await {
                    Ok(response) => {
                        tracing::debug!(
                            "tracker {base_url} confirmed interval {}s",
                            response.interval_secs
                        );
                        return Ok(response);
                    }
                    Err(violation @ SpoofError::ProtocolViolation { .. }) => {
                        return Err(violation);
                    }
                    Err(e) => {
                        tracing::warn!("tracker {base_url} failed: {e}");
                        last_error = Some(e);
                    }
                }
            }
        }

        Err(SpoofError::TrackerUnreachable {
            attempts,
            last: Box::new(last_error.unwrap_or(SpoofError::MissingTcpTracker)),
        })
    }

    async fn attempt(&self, base_url: &str, query: &str) -> Result<TrackerResponse> {
        let url = append_query(base_url, query);
        let body = self.transport.fetch(&url).await?;
        let body = gunzip_if_needed(body);
        self.parse_response(base_url, &body)
    }

    fn parse_response(&self, url: &str, body: &[u8]) -> Result<TrackerResponse> {
        let failed = |reason: String| SpoofError::TrackerRequestFailed {
            url: url.to_string(),
            reason,
        };

        let decoded =
            bencode::decode(body).map_err(|e| failed(format!("undecodable response: {e}")))?;

        let parsed = {
            let dict = decoded
                .as_dict()
                .ok_or_else(|| failed("response is not a dictionary".to_string()))?;

            if let Some(reason) = dict.get(b"failure reason").and_then(BencodeValue::as_bytes) {
                return Err(failed(format!(
                    "tracker rejected announce: {}",
                    String::from_utf8_lossy(reason)
                )));
            }

            let interval = dict
                .get(b"min interval")
                .and_then(BencodeValue::as_int)
                .or_else(|| dict.get(b"interval").and_then(BencodeValue::as_int));

            let swarm_count = |key: &[u8]| {
                dict.get(key)
                    .and_then(BencodeValue::as_int)
                    .and_then(|count| u64::try_from(count).ok())
                    .unwrap_or(0)
            };

            interval.map(|interval| TrackerResponse {
                interval_secs: if interval > 0 {
                    interval as u64
                } else {
                    self.default_interval_secs
                },
                seeders: swarm_count(b"complete"),
                leechers: swarm_count(b"incomplete"),
            })
        };

        parsed.ok_or(SpoofError::ProtocolViolation { response: decoded })
    }
}

/// Appends the announce query to a base URL that may already carry one.
fn append_query(base_url: &str, query: &str) -> String {
    if base_url.contains('?') {
        format!("{base_url}&{query}")
    } else {
        format!("{base_url}?{query}")
    }
}

/// Transparently decompresses gzip bodies, identified by their magic bytes.
///
/// Some trackers gzip without announcing it and some mislabel plain bodies;
/// decompression failures fall back to the raw bytes.
fn gunzip_if_needed(body: Vec<u8>) -> Vec<u8> {
    if body.len() < 2 || body[0] != 0x1f || body[1] != 0x8b {
        return body;
    }

    let mut decompressed = Vec::new();
    match GzDecoder::new(body.as_slice()).read_to_end(&mut decompressed) {
        Ok(_) => decompressed,
        Err(_) => body,
    }
}
