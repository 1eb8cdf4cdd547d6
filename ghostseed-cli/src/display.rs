//! Console status rendering
//!
//! Repaints a compact status screen once per second: torrent facts, the
//! announce history ring, swarm counts, and the countdown to the next
//! announce. Reads the shared state under the same discipline as the other
//! tasks and never writes to it.

use std::sync::Arc;
use std::time::Duration;

use ghostseed_core::SharedState;
use tokio::task::JoinHandle;

/// Static torrent facts shown in the status header.
#[derive(Debug, Clone)]
pub struct StatusHeader {
    pub torrent_name: String,
    pub total_size: u64,
    pub download_speed_kbps: u64,
    pub upload_speed_kbps: u64,
}

/// Spawns the status renderer task, repainting once per second.
pub fn spawn_status(shared: Arc<SharedState>, header: StatusHeader) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            print!("{}", render(&shared, &header));
        }
    })
}

fn render(shared: &SharedState, header: &StatusHeader) -> String {
    use std::fmt::Write as _;

    let swarm = shared.swarm();
    let records = shared.history_snapshot();

    let mut out = String::new();
    out.push_str("\x1bc"); // reset screen
    let _ = writeln!(out, "{}", "#".repeat(74));
    let _ = writeln!(out, "Torrent: {}", header.torrent_name);
    let _ = writeln!(
        out,
        "Size: {} | down: {}KB/s | up: {}KB/s",
        human_size(header.total_size),
        header.download_speed_kbps,
        header.upload_speed_kbps
    );
    let _ = writeln!(
        out,
        "Seeders: {} | Leechers: {}",
        swarm.seeders, swarm.leechers
    );
    let _ = writeln!(out, "{}", "#".repeat(74));

    for (index, record) in records.iter().enumerate() {
        let _ = write!(
            out,
            "#{} downloaded: {} ({:.1}%) | left: {} | uploaded: {}",
            record.sequence,
            human_size(record.downloaded),
            record.percent,
            human_size(record.left),
            human_size(record.uploaded),
        );
        if index + 1 == records.len() {
            let _ = writeln!(
                out,
                " | next announce in {}",
                fmt_countdown(shared.countdown_secs())
            );
        } else {
            out.push_str(" | announced\n");
        }
    }
    out
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.2}{}", UNITS[unit])
}

fn fmt_countdown(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use ghostseed_core::AnnounceRecord;

    use super::*;

    #[test]
    fn test_human_size_units() {
        assert_eq!(human_size(0), "0.00B");
        assert_eq!(human_size(1023), "1023.00B");
        assert_eq!(human_size(1024), "1.00KiB");
        assert_eq!(human_size(1536), "1.50KiB");
        assert_eq!(human_size(1 << 30), "1.00GiB");
        assert_eq!(human_size(1u64 << 42), "4.00TiB");
    }

    #[test]
    fn test_fmt_countdown() {
        assert_eq!(fmt_countdown(0), "0:00:00");
        assert_eq!(fmt_countdown(59), "0:00:59");
        assert_eq!(fmt_countdown(3661), "1:01:01");
        assert_eq!(fmt_countdown(-5), "0:00:00");
    }

    #[test]
    fn test_render_marks_only_latest_record_with_countdown() {
        let shared = SharedState::new();
        shared.reset_countdown(90);
        for sequence in 1..=2 {
            shared.push_record(AnnounceRecord {
                sequence,
                downloaded: sequence * 1024,
                uploaded: 0,
                left: 4096,
                percent: 25.0,
            });
        }

        let header = StatusHeader {
            torrent_name: "test.iso".to_string(),
            total_size: 8192,
            download_speed_kbps: 100,
            upload_speed_kbps: 50,
        };
        let output = render(&shared, &header);

        assert!(output.contains("Torrent: test.iso"));
        assert_eq!(output.matches("announced").count(), 1);
        assert_eq!(output.matches("next announce in 0:01:30").count(), 1);
    }
}
