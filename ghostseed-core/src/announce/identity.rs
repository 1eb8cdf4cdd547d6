//! Session identity generation

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;

/// Identity presented to trackers for the lifetime of the process.
///
/// Generated once at session start and immutable thereafter, like a real
/// client that keeps its peer id and key across announces.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    /// Client-signature prefix followed by 12 random URL-safe characters
    pub peer_id: String,
    /// Random 32-bit value, hex-encoded
    pub key: String,
}

impl SessionIdentity {
    pub fn generate(peer_id_prefix: &str) -> Self {
        let mut rng = rand::rng();

        // 9 random bytes encode to exactly 12 URL-safe base64 characters.
        let mut raw = [0u8; 9];
        rng.fill(&mut raw[..]);
        let peer_id = format!("{peer_id_prefix}{}", URL_SAFE_NO_PAD.encode(raw));

        let key = format!("{:08X}", rng.random::<u32>());

        Self { peer_id, key }
    }
}
