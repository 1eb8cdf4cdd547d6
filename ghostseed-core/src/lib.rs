//! Ghostseed Core - Tracker announce engine with synthetic transfer accounting
//!
//! This crate provides the building blocks for reporting fabricated
//! download/upload statistics to BitTorrent trackers: bencode decoding with
//! byte-span capture, torrent metadata extraction, piece-aligned progress
//! simulation, the announce session state machine, and the concurrent
//! scheduler tasks that drive it.

pub mod announce;
pub mod bencode;
pub mod config;
pub mod metainfo;
pub mod progress;
pub mod scheduler;

// Re-export main types for convenient access
pub use announce::{AnnounceEvent, AnnounceHistory, AnnounceRecord, AnnounceSession, SessionParams};
pub use bencode::BencodeValue;
pub use config::SpoofConfig;
pub use metainfo::TorrentMetadata;
pub use scheduler::SharedState;

/// Errors that can occur while decoding metadata or talking to trackers.
///
/// Startup errors (`MalformedEncoding`, `InvalidMetadata`,
/// `MissingTcpTracker`) are fatal; announce-time errors abort the current
/// cycle and propagate to the caller.
#[derive(Debug, thiserror::Error)]
pub enum SpoofError {
    #[error("malformed bencode at byte {offset}: {reason}")]
    MalformedEncoding { offset: usize, reason: String },

    #[error("invalid torrent metadata: {reason}")]
    InvalidMetadata { reason: String },

    #[error("torrent exposes no http(s) announce url")]
    MissingTcpTracker,

    #[error("tracker request to {url} failed: {reason}")]
    TrackerRequestFailed { url: String, reason: String },

    #[error("all {attempts} tracker announce urls failed")]
    TrackerUnreachable {
        attempts: usize,
        #[source]
        last: Box<SpoofError>,
    },

    #[error("tracker response carries neither \"min interval\" nor \"interval\"")]
    ProtocolViolation { response: BencodeValue },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SpoofError>;
