//! Synthetic transfer accounting
//!
//! Advances the fabricated download/upload counters between announces.
//! Growth is piece-aligned with a small random overshoot, modeling the
//! piece-completion jitter of a real client. Downloads are capped at the
//! torrent size; uploads are never capped, since seeding can exceed the
//! total size indefinitely.

use rand::Rng;

/// Computes the next total byte count after `elapsed_secs` at `speed_kbps`.
///
/// A speed of zero models a stalled transfer and returns `current`
/// unchanged. Otherwise the raw linear growth is rounded to whole pieces
/// and inflated by 1-10 extra pieces of jitter, then clamped to `cap` when
/// one is given.
///
/// `piece_size` must be non-zero.
pub fn next_total(
    speed_kbps: u64,
    current: u64,
    piece_size: u64,
    elapsed_secs: u64,
    cap: Option<u64>,
) -> u64 {
    if speed_kbps == 0 {
        return current;
    }

    let raw_total = current + speed_kbps * 1024 * elapsed_secs;
    let jitter = rand::rng().random_range(1..=10u64);
    let candidate = (raw_total / piece_size + jitter) * piece_size;

    match cap {
        Some(limit) if candidate > limit => limit,
        _ => candidate,
    }
}

/// Bytes remaining to download; saturates at zero.
pub fn left_bytes(total_size: u64, downloaded: u64) -> u64 {
    total_size.saturating_sub(downloaded)
}

/// Maps a starting percentage (0-100) to a piece-aligned byte count.
///
/// Returns 0 for any percentage at or below zero; never exceeds
/// `total_size`.
pub fn find_approx_current(total_size: u64, piece_size: u64, percent: f64) -> u64 {
    if percent <= 0.0 {
        return 0;
    }
    let target = (percent.min(100.0) / 100.0) * total_size as f64;
    ((target as u64) / piece_size) * piece_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_speed_models_stalled_transfer() {
        assert_eq!(next_total(0, 500, 16_384, 1800, None), 500);
        assert_eq!(next_total(0, 500, 16_384, 1800, Some(1000)), 500);
    }

    #[test]
    fn test_growth_is_monotonic_and_piece_aligned() {
        let piece_size = 16_384;
        let mut current = 0u64;
        for _ in 0..50 {
            let next = next_total(100, current, piece_size, 60, None);
            assert!(next >= current);
            assert_eq!(next % piece_size, 0);
            current = next;
        }
    }

    #[test]
    fn test_jitter_stays_within_ten_pieces() {
        let piece_size = 16_384;
        let current = 10 * piece_size;
        let elapsed = 10;
        let raw_total = current + 100 * 1024 * elapsed;
        let floor = raw_total / piece_size * piece_size;

        for _ in 0..100 {
            let next = next_total(100, current, piece_size, elapsed, None);
            assert!(next >= floor + piece_size);
            assert!(next <= floor + 10 * piece_size);
        }
    }

    #[test]
    fn test_cap_never_exceeded() {
        let cap = 1_048_576;
        for _ in 0..100 {
            let next = next_total(10_000, 1_000_000, 16_384, 1800, Some(cap));
            assert!(next <= cap);
        }
    }

    #[test]
    fn test_left_bytes_never_negative() {
        assert_eq!(left_bytes(1000, 0), 1000);
        assert_eq!(left_bytes(1000, 1000), 0);
        assert_eq!(left_bytes(1000, 2000), 0);
    }

    #[test]
    fn test_find_approx_current_piece_aligned() {
        // floor(500000 / 16384) * 16384
        assert_eq!(find_approx_current(1_000_000, 16_384, 50.0), 491_520);
    }

    #[test]
    fn test_find_approx_current_boundaries() {
        assert_eq!(find_approx_current(1_000_000, 16_384, 0.0), 0);
        assert_eq!(find_approx_current(1_000_000, 16_384, -5.0), 0);
        assert!(find_approx_current(1_000_000, 16_384, 100.0) <= 1_000_000);
        assert!(find_approx_current(1_000_000, 16_384, 250.0) <= 1_000_000);
    }
}
