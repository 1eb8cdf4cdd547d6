//! Announce session state machine
//!
//! Owns the identity, the tracker client, and the scheduling bookkeeping
//! for one torrent. The session is driven by the scheduler: it seeds the
//! first record at construction, then alternates `schedule_next` and
//! `announce` until the process ends.

use std::sync::Arc;

use crate::announce::{AnnounceClient, AnnounceEvent, AnnounceRecord, SessionIdentity};
use crate::config::SpoofConfig;
use crate::metainfo::TorrentMetadata;
use crate::scheduler::SharedState;
use crate::{Result, progress};

/// Validated opening counters and speeds for a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionParams {
    pub initial_downloaded: u64,
    pub initial_uploaded: u64,
    pub download_speed_kbps: u64,
    pub upload_speed_kbps: u64,
}

/// One announce session against a torrent's tracker tiers.
pub struct AnnounceSession {
    metadata: TorrentMetadata,
    identity: SessionIdentity,
    client: AnnounceClient,
    shared: Arc<SharedState>,
    port: u16,
    download_speed_kbps: u64,
    upload_speed_kbps: u64,
    /// Last tracker-confirmed announce interval
    interval_secs: u64,
    /// Peers requested per announce; drops to 0 once the download is done
    numwant: u32,
    sequence: u64,
}

impl AnnounceSession {
    /// Creates the session and seeds announce record #1 from the validated
    /// initial counters.
    pub fn new(
        metadata: TorrentMetadata,
        config: &SpoofConfig,
        params: SessionParams,
        shared: Arc<SharedState>,
    ) -> Self {
        let identity = SessionIdentity::generate(config.client.peer_id_prefix);
        let client = AnnounceClient::new(metadata.announce_tiers.clone(), config);

        let mut session = Self {
            metadata,
            identity,
            client,
            shared,
            port: config.client.port,
            download_speed_kbps: params.download_speed_kbps,
            upload_speed_kbps: params.upload_speed_kbps,
            interval_secs: config.network.default_announce_interval.as_secs(),
            numwant: config.client.numwant,
            sequence: 0,
        };
        session.push_record(
            params.initial_downloaded.min(session.metadata.total_size),
            params.initial_uploaded,
        );
        session
    }

    /// Resets the shared countdown and appends the next synthetic record.
    ///
    /// Once downloaded reaches the torrent size the counters freeze there
    /// and numwant latches to 0: a complete download no longer seeks peers.
    pub fn schedule_next(&mut self) {
        self.shared.reset_countdown(self.interval_secs);

        let last = self.latest_record();
        let total = self.metadata.total_size;

        let downloaded = if last.downloaded < total {
            progress::next_total(
                self.download_speed_kbps,
                last.downloaded,
                self.metadata.piece_size,
                self.interval_secs,
                Some(total),
            )
        } else {
            total
        };
        let uploaded = progress::next_total(
            self.upload_speed_kbps,
            last.uploaded,
            self.metadata.piece_size,
            self.interval_secs,
            None,
        );

        if downloaded >= total {
            self.numwant = 0;
        }

        self.push_record(downloaded, uploaded);
    }

    /// Reports the latest record to the trackers.
    ///
    /// A successful response updates the confirmed interval and the shared
    /// swarm statistics. Failures abort the cycle and propagate; the next
    /// scheduled cycle is the only recovery path.
    ///
    /// # Errors
    /// - `SpoofError::TrackerUnreachable` - Every URL in every tier failed
    /// - `SpoofError::ProtocolViolation` - Tracker answered without an interval
    pub async fn announce(&mut self, event: AnnounceEvent) -> Result<()> {
        let record = self.latest_record();
        let query = self.build_query(&record, event);

        let response = self.client.announce(&query).await?;
        self.interval_secs = response.interval_secs;
        self.shared.set_swarm(response.seeders, response.leechers);

        tracing::info!(
            "announce #{} confirmed: downloaded {} / uploaded {} / left {}, next in {}s",
            record.sequence,
            record.downloaded,
            record.uploaded,
            record.left,
            self.interval_secs
        );
        Ok(())
    }

    /// Farewell announce on shutdown: `stopped`, no peers wanted.
    ///
    /// # Errors
    /// Same as [`Self::announce`].
    pub async fn shutdown(&mut self) -> Result<()> {
        self.numwant = 0;
        self.announce(AnnounceEvent::Stopped).await
    }

    /// Last tracker-confirmed interval in seconds.
    pub fn confirmed_interval_secs(&self) -> u64 {
        self.interval_secs
    }

    pub fn torrent_name(&self) -> &str {
        &self.metadata.name
    }

    fn latest_record(&self) -> AnnounceRecord {
        self.shared
            .latest_record()
            .expect("history is seeded at session construction")
    }

    fn push_record(&mut self, downloaded: u64, uploaded: u64) {
        self.sequence += 1;
        let total = self.metadata.total_size;
        let percent = if total == 0 {
            100.0
        } else {
            downloaded as f64 / total as f64 * 100.0
        };
        self.shared.push_record(AnnounceRecord {
            sequence: self.sequence,
            downloaded,
            uploaded,
            left: progress::left_bytes(total, downloaded),
            percent,
        });
    }

    fn build_query(&self, record: &AnnounceRecord, event: AnnounceEvent) -> String {
        use std::fmt::Write as _;

        let mut query = format!(
            "info_hash={}&peer_id={}&port={}&uploaded={}&downloaded={}&left={}&corrupt=0&key={}",
            self.metadata.info_hash_encoded(),
            self.identity.peer_id,
            self.port,
            record.uploaded,
            record.downloaded,
            record.left,
            self.identity.key,
        );
        if let Some(name) = event.wire_name() {
            let _ = write!(query, "&event={name}");
        }
        let _ = write!(
            query,
            "&numwant={}&compact=1&no_peer_id=1&supportcrypto=1&redundant=0",
            self.numwant
        );
        query
    }

    #[cfg(test)]
    pub(crate) fn replace_client(&mut self, client: AnnounceClient) {
        self.client = client;
    }

    #[cfg(test)]
    pub(crate) fn set_interval_secs(&mut self, secs: u64) {
        self.interval_secs = secs;
    }
}
