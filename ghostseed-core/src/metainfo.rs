//! Torrent metadata extraction and info hash calculation

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_encode};
use sha1::{Digest, Sha1};

use crate::bencode::{self, BencodeValue, Dictionary};
use crate::{Result, SpoofError};

// RFC 3986 unreserved bytes stay literal; everything else becomes %XX.
const INFO_HASH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Metadata extracted from a torrent document.
///
/// Carries everything the announce session needs: sizes for the synthetic
/// counters, the announce tiers for failover, and the SHA-1 info hash that
/// identifies the torrent to trackers.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentMetadata {
    pub name: String,
    /// Sum of all file lengths in bytes
    pub total_size: u64,
    /// Piece size in bytes
    pub piece_size: u64,
    /// Primary announce URL
    pub primary_announce: String,
    /// Fallback-ordered groups of equivalent HTTP(S) tracker URLs
    pub announce_tiers: Vec<Vec<String>>,
    /// SHA-1 digest of the raw "info" dictionary bytes
    pub info_hash: [u8; 20],
}

impl TorrentMetadata {
    /// Decodes a bencoded torrent document and extracts its metadata.
    ///
    /// UDP tracker URLs are dropped here; announce tiers keep HTTP(S) URLs
    /// only, since the UDP tracker protocol is unsupported by design.
    ///
    /// # Errors
    /// - `SpoofError::MalformedEncoding` - Document is not valid bencode
    /// - `SpoofError::InvalidMetadata` - Required fields missing or invalid
    /// - `SpoofError::MissingTcpTracker` - No HTTP(S) announce URL at all
    pub fn from_bencode(raw: &[u8]) -> Result<Self> {
        let root = match bencode::decode(raw)? {
            BencodeValue::Dictionary(dict) => dict,
            _ => {
                return Err(SpoofError::InvalidMetadata {
                    reason: "root element must be a dictionary".to_string(),
                });
            }
        };

        let info = root.dict(b"info")?;
        let name = info.utf8(b"name")?.to_string();

        let piece_size = info.integer(b"piece length")?;
        if piece_size <= 0 {
            return Err(SpoofError::InvalidMetadata {
                reason: format!("non-positive piece length {piece_size}"),
            });
        }

        let total_size = extract_total_size(info)?;
        let (primary_announce, announce_tiers) = extract_announce_tiers(&root)?;

        let span = info.span();
        let mut hasher = Sha1::new();
        hasher.update(&raw[span.start..span.end]);
        let mut info_hash = [0u8; 20];
        info_hash.copy_from_slice(&hasher.finalize());

        tracing::debug!(
            "loaded torrent {name}: {total_size} bytes, info hash {}",
            hex::encode(info_hash)
        );

        Ok(Self {
            name,
            total_size,
            piece_size: piece_size as u64,
            primary_announce,
            announce_tiers,
            info_hash,
        })
    }

    /// Percent-encoded info hash, ready for the announce query string.
    pub fn info_hash_encoded(&self) -> String {
        percent_encode(&self.info_hash, INFO_HASH_ENCODE_SET).to_string()
    }
}

/// Single-file torrents carry `length`; multi-file torrents a `files` list.
fn extract_total_size(info: &Dictionary) -> Result<u64> {
    if let Some(value) = info.get(b"length") {
        let length = value.as_int().ok_or_else(|| SpoofError::InvalidMetadata {
            reason: "invalid `length` field".to_string(),
        })?;
        return non_negative(length);
    }

    let mut total: u64 = 0;
    for file in info.list(b"files")? {
        let file_dict = file.as_dict().ok_or_else(|| SpoofError::InvalidMetadata {
            reason: "invalid file entry type".to_string(),
        })?;
        total += non_negative(file_dict.integer(b"length")?)?;
    }
    Ok(total)
}

fn non_negative(length: i64) -> Result<u64> {
    u64::try_from(length).map_err(|_| SpoofError::InvalidMetadata {
        reason: format!("negative file length {length}"),
    })
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Builds the fallback-ordered tier list from `announce` and
/// `announce-list`, keeping HTTP(S) URLs only.
///
/// The primary announce URL becomes its own leading tier unless it already
/// appears somewhere in the list.
fn extract_announce_tiers(root: &Dictionary) -> Result<(String, Vec<Vec<String>>)> {
    let mut tiers: Vec<Vec<String>> = Vec::new();

    if let Some(BencodeValue::List(announce_list)) = root.get(b"announce-list") {
        for tier in announce_list {
            let Some(urls) = tier.as_list() else { continue };
            let kept: Vec<String> = urls
                .iter()
                .filter_map(|url| url.as_bytes())
                .filter_map(|bytes| std::str::from_utf8(bytes).ok())
                .filter(|url| is_http_url(url))
                .map(str::to_string)
                .collect();
            if !kept.is_empty() {
                tiers.push(kept);
            }
        }
    }

    let primary = root
        .get(b"announce")
        .and_then(BencodeValue::as_bytes)
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .filter(|url| is_http_url(url))
        .map(str::to_string);

    if let Some(url) = &primary {
        let already_listed = tiers.iter().flatten().any(|listed| listed == url);
        if !already_listed {
            tiers.insert(0, vec![url.clone()]);
        }
    }

    if tiers.is_empty() {
        return Err(SpoofError::MissingTcpTracker);
    }

    let primary = primary.unwrap_or_else(|| tiers[0][0].clone());
    Ok((primary, tiers))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ben_str(text: &str) -> String {
        format!("{}:{}", text.len(), text)
    }

    fn single_file_info(name: &str, length: u64, piece_size: u64) -> String {
        format!(
            "d{}i{length}e{}{}{}i{piece_size}e{}{}e",
            ben_str("length"),
            ben_str("name"),
            ben_str(name),
            ben_str("piece length"),
            ben_str("pieces"),
            ben_str("xxxxxxxxxxxxxxxxxxxx"),
        )
    }

    fn torrent_doc(announce: &str, info_body: &str) -> Vec<u8> {
        format!("d{}{}{}{info_body}e", ben_str("announce"), ben_str(announce), ben_str("info"))
            .into_bytes()
    }

    #[test]
    fn test_single_file_metadata() {
        let info = single_file_info("test.iso", 1_048_576, 262_144);
        let doc = torrent_doc("http://tracker.example/announce", &info);

        let metadata = TorrentMetadata::from_bencode(&doc).unwrap();
        assert_eq!(metadata.name, "test.iso");
        assert_eq!(metadata.total_size, 1_048_576);
        assert_eq!(metadata.piece_size, 262_144);
        assert_eq!(
            metadata.primary_announce,
            "http://tracker.example/announce"
        );
        assert_eq!(
            metadata.announce_tiers,
            vec![vec!["http://tracker.example/announce".to_string()]]
        );
    }

    #[test]
    fn test_info_hash_covers_exact_info_slice() {
        let info = single_file_info("test.iso", 4096, 1024);
        let doc = torrent_doc("http://tracker.example/announce", &info);

        let metadata = TorrentMetadata::from_bencode(&doc).unwrap();

        let mut hasher = Sha1::new();
        hasher.update(info.as_bytes());
        let mut expected = [0u8; 20];
        expected.copy_from_slice(&hasher.finalize());
        assert_eq!(metadata.info_hash, expected);
    }

    #[test]
    fn test_info_hash_percent_encoding_keeps_unreserved_bytes() {
        let metadata = TorrentMetadata {
            name: "t".to_string(),
            total_size: 1,
            piece_size: 1,
            primary_announce: "http://t/announce".to_string(),
            announce_tiers: vec![vec!["http://t/announce".to_string()]],
            info_hash: *b"aA0.-_~\x00\xff $\x01zzzzzzzz",
        };

        assert_eq!(
            metadata.info_hash_encoded(),
            "aA0.-_~%00%FF%20%24%01zzzzzzzz"
        );
    }

    #[test]
    fn test_multi_file_total_size_sums_lengths() {
        let files = format!(
            "l d{}i100e{}l{}ee d{}i200e{}l{}ee e",
            ben_str("length"),
            ben_str("path"),
            ben_str("a.txt"),
            ben_str("length"),
            ben_str("path"),
            ben_str("b.txt"),
        )
        .replace(' ', "");
        let info = format!(
            "d{}{files}{}{}{}i16384e{}{}e",
            ben_str("files"),
            ben_str("name"),
            ben_str("dir"),
            ben_str("piece length"),
            ben_str("pieces"),
            ben_str("xxxxxxxxxxxxxxxxxxxx"),
        );
        let doc = torrent_doc("https://tracker.example/announce", &info);

        let metadata = TorrentMetadata::from_bencode(&doc).unwrap();
        assert_eq!(metadata.total_size, 300);
    }

    #[test]
    fn test_udp_urls_dropped_from_tiers() {
        let info = single_file_info("test.iso", 4096, 1024);
        let announce_list = format!(
            "ll{}{}el{}ee",
            ben_str("udp://tracker.example:80/announce"),
            ben_str("http://one.example/announce"),
            ben_str("https://two.example/announce"),
        );
        let doc = format!(
            "d{}{}{}{announce_list}{}{}e",
            ben_str("announce"),
            ben_str("http://one.example/announce"),
            ben_str("announce-list"),
            ben_str("info"),
            info,
        )
        .into_bytes();

        let metadata = TorrentMetadata::from_bencode(&doc).unwrap();
        assert_eq!(
            metadata.announce_tiers,
            vec![
                vec!["http://one.example/announce".to_string()],
                vec!["https://two.example/announce".to_string()],
            ]
        );
    }

    #[test]
    fn test_primary_announce_prepended_when_not_listed() {
        let info = single_file_info("test.iso", 4096, 1024);
        let announce_list = format!("ll{}ee", ben_str("http://backup.example/announce"));
        let doc = format!(
            "d{}{}{}{announce_list}{}{}e",
            ben_str("announce"),
            ben_str("http://main.example/announce"),
            ben_str("announce-list"),
            ben_str("info"),
            info,
        )
        .into_bytes();

        let metadata = TorrentMetadata::from_bencode(&doc).unwrap();
        assert_eq!(metadata.primary_announce, "http://main.example/announce");
        assert_eq!(
            metadata.announce_tiers,
            vec![
                vec!["http://main.example/announce".to_string()],
                vec!["http://backup.example/announce".to_string()],
            ]
        );
    }

    #[test]
    fn test_udp_only_torrent_rejected() {
        let info = single_file_info("test.iso", 4096, 1024);
        let doc = torrent_doc("udp://tracker.example:80/announce", &info);

        assert!(matches!(
            TorrentMetadata::from_bencode(&doc),
            Err(SpoofError::MissingTcpTracker)
        ));
    }

    #[test]
    fn test_missing_info_rejected() {
        let doc = format!(
            "d{}{}e",
            ben_str("announce"),
            ben_str("http://tracker.example/announce")
        )
        .into_bytes();

        assert!(matches!(
            TorrentMetadata::from_bencode(&doc),
            Err(SpoofError::InvalidMetadata { .. })
        ));
    }

    #[test]
    fn test_non_dictionary_root_rejected() {
        assert!(matches!(
            TorrentMetadata::from_bencode(b"li1ee"),
            Err(SpoofError::InvalidMetadata { .. })
        ));
    }

    #[test]
    fn test_malformed_document_rejected() {
        assert!(matches!(
            TorrentMetadata::from_bencode(b"d3:foo"),
            Err(SpoofError::MalformedEncoding { .. })
        ));
    }
}
