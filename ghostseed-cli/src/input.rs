//! Validation of human-entered size and speed strings

use anyhow::{Context, bail};
use ghostseed_core::progress;

/// Parses an initial amount such as `42%`, `700mb`, or `0b` into bytes.
///
/// Percentages map to a piece-aligned byte count; absolute sizes use
/// powers of 1024.
pub fn parse_size(input: &str, total_size: u64, piece_size: u64) -> anyhow::Result<u64> {
    let lower = input.trim().to_lowercase();

    if let Some(number) = lower.strip_suffix('%') {
        let percent: f64 = number
            .parse()
            .with_context(|| format!("invalid percent value `{input}`"))?;
        if !(0.0..=100.0).contains(&percent) {
            bail!("percent value must be within 0-100");
        }
        return Ok(progress::find_approx_current(total_size, piece_size, percent));
    }

    let (number, multiplier) = if let Some(number) = lower.strip_suffix("kb") {
        (number, 1024f64)
    } else if let Some(number) = lower.strip_suffix("mb") {
        (number, 1024f64.powi(2))
    } else if let Some(number) = lower.strip_suffix("gb") {
        (number, 1024f64.powi(3))
    } else if let Some(number) = lower.strip_suffix("tb") {
        (number, 1024f64.powi(4))
    } else if let Some(number) = lower.strip_suffix('b') {
        (number, 1f64)
    } else {
        bail!("size `{input}` must end in %, b, kb, mb, gb or tb");
    };

    let value: f64 = number
        .trim()
        .parse()
        .with_context(|| format!("invalid size value `{input}`"))?;
    if value < 0.0 {
        bail!("size can not be negative");
    }
    Ok((value * multiplier) as u64)
}

/// Parses an initial downloaded amount, which may not exceed the torrent
/// size.
pub fn parse_initial_downloaded(
    input: &str,
    total_size: u64,
    piece_size: u64,
) -> anyhow::Result<u64> {
    let bytes = parse_size(input, total_size, piece_size)?;
    if bytes > total_size {
        bail!("initial downloaded can not be higher than the torrent size");
    }
    Ok(bytes)
}

/// Parses a speed such as `120kbps` or `2mbps` into KiB/s.
pub fn parse_speed(input: &str) -> anyhow::Result<u64> {
    let lower = input.trim().to_lowercase();

    let (number, multiplier) = if let Some(number) = lower.strip_suffix("kbps") {
        (number, 1f64)
    } else if let Some(number) = lower.strip_suffix("mbps") {
        (number, 1024f64)
    } else {
        bail!("speed `{input}` must end in kbps or mbps");
    };

    let value: f64 = number
        .trim()
        .parse()
        .with_context(|| format!("invalid speed value `{input}`"))?;
    if value < 0.0 {
        bail!("speed can not be negative");
    }
    Ok((value * multiplier) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_maps_to_piece_aligned_bytes() {
        assert_eq!(parse_size("50%", 1_000_000, 16_384).unwrap(), 491_520);
        assert_eq!(parse_size("0%", 1_000_000, 16_384).unwrap(), 0);
    }

    #[test]
    fn test_absolute_sizes_use_powers_of_1024() {
        assert_eq!(parse_size("512b", 0, 1).unwrap(), 512);
        assert_eq!(parse_size("2kb", 0, 1).unwrap(), 2048);
        assert_eq!(parse_size("3MB", 0, 1).unwrap(), 3 * 1024 * 1024);
        assert_eq!(parse_size("1gb", 0, 1).unwrap(), 1 << 30);
        assert_eq!(parse_size("1tb", 0, 1).unwrap(), 1u64 << 40);
    }

    #[test]
    fn test_unknown_size_suffix_rejected() {
        assert!(parse_size("100", 0, 1).is_err());
        assert!(parse_size("100kbps", 0, 1).is_err());
    }

    #[test]
    fn test_percent_out_of_range_rejected() {
        assert!(parse_size("101%", 1000, 1).is_err());
        assert!(parse_size("-1%", 1000, 1).is_err());
    }

    #[test]
    fn test_initial_downloaded_capped_by_torrent_size() {
        assert!(parse_initial_downloaded("2kb", 1024, 1).is_err());
        assert_eq!(parse_initial_downloaded("1kb", 1024, 1).unwrap(), 1024);
    }

    #[test]
    fn test_speed_suffixes() {
        assert_eq!(parse_speed("120kbps").unwrap(), 120);
        assert_eq!(parse_speed("2mbps").unwrap(), 2048);
        assert_eq!(parse_speed("0kbps").unwrap(), 0);
    }

    #[test]
    fn test_invalid_speed_rejected() {
        assert!(parse_speed("120").is_err());
        assert!(parse_speed("fastkbps").is_err());
        assert!(parse_speed("-5kbps").is_err());
    }
}
