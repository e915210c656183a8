//! Latest-complete-record extraction from a file that is still being written.
//!
//! powermetrics appends one plist document per interval and separates
//! documents with a single NUL byte. A read can land in the middle of a
//! write, so the newest segment may be truncated. The reader then falls back
//! to the segment before it, and no further: worst-case staleness is one
//! extra interval.

use std::io::ErrorKind;
use std::path::Path;

use crate::error::{MetricsError, Result};
use crate::record::SampleRecord;

/// Record separator written between documents.
pub const RECORD_DELIMITER: u8 = 0x00;

/// Reads `path` and returns the newest fully decodable record.
///
/// Fails with [`MetricsError::NoData`] when the file does not exist yet or
/// neither of the two newest segments decodes. Other I/O failures are
/// reported as [`MetricsError::Io`].
pub fn read_latest(path: &Path) -> Result<SampleRecord> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(MetricsError::NoData {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(MetricsError::Io {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    latest_record(&data).ok_or_else(|| MetricsError::NoData {
        path: path.to_path_buf(),
    })
}

/// Applies the last / second-to-last rule to an in-memory buffer.
pub fn latest_record(data: &[u8]) -> Option<SampleRecord> {
    let segments: Vec<&[u8]> = data.split(|&b| b == RECORD_DELIMITER).collect();
    let (last, earlier) = segments.split_last()?;

    match decode_segment(last) {
        Ok(record) => return Some(record),
        Err(e) => log::debug!("newest segment ({} bytes) not decodable: {e}", last.len()),
    }

    let previous = earlier.last()?;
    match decode_segment(previous) {
        Ok(record) => Some(record),
        Err(e) => {
            log::debug!(
                "previous segment ({} bytes) not decodable either: {e}",
                previous.len()
            );
            None
        }
    }
}

fn decode_segment(segment: &[u8]) -> std::result::Result<SampleRecord, plist::Error> {
    let start = segment
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(segment.len());
    SampleRecord::from_plist_bytes(&segment[start..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::{sample_plist, truncated};

    #[test]
    fn single_document() {
        let doc = sample_plist("2024-01-01T00:00:00Z", "Nominal");
        let record = latest_record(doc.as_bytes()).unwrap();
        assert_eq!(record.thermal_pressure.as_deref(), Some("Nominal"));
    }

    #[test]
    fn returns_last_of_two_documents() {
        let first = sample_plist("2024-01-01T00:00:00Z", "Nominal");
        let second = sample_plist("2024-01-01T00:00:01Z", "Heavy");
        let data = format!("{first}\0{second}");
        let record = latest_record(data.as_bytes()).unwrap();
        assert_eq!(record.thermal_pressure.as_deref(), Some("Heavy"));
    }

    #[test]
    fn trailing_delimiter_falls_back_to_complete_document() {
        let first = sample_plist("2024-01-01T00:00:00Z", "Moderate");
        let data = format!("{first}\0");
        let record = latest_record(data.as_bytes()).unwrap();
        assert_eq!(record.thermal_pressure.as_deref(), Some("Moderate"));
    }

    #[test]
    fn torn_last_segment_uses_previous() {
        let first = sample_plist("2024-01-01T00:00:00Z", "Nominal");
        let second = sample_plist("2024-01-01T00:00:01Z", "Heavy");
        let data = format!("{first}\0{}", truncated(&second));
        let record = latest_record(data.as_bytes()).unwrap();
        assert_eq!(record.thermal_pressure.as_deref(), Some("Nominal"));
    }

    #[test]
    fn two_torn_segments_yield_nothing() {
        let first = sample_plist("2024-01-01T00:00:00Z", "Nominal");
        let second = sample_plist("2024-01-01T00:00:01Z", "Heavy");
        let third = sample_plist("2024-01-01T00:00:02Z", "Heavy");
        let data = format!(
            "{first}\0{}\0{}",
            truncated(&second),
            truncated(&third)
        );
        assert!(latest_record(data.as_bytes()).is_none());
    }

    #[test]
    fn lone_torn_segment_yields_nothing() {
        let doc = sample_plist("2024-01-01T00:00:00Z", "Nominal");
        assert!(latest_record(truncated(&doc).as_bytes()).is_none());
        assert!(latest_record(b"").is_none());
    }

    #[test]
    fn leading_newline_after_delimiter_is_ignored() {
        let first = sample_plist("2024-01-01T00:00:00Z", "Nominal");
        let second = sample_plist("2024-01-01T00:00:01Z", "Trapping");
        let data = format!("{first}\n\0\n{second}");
        let record = latest_record(data.as_bytes()).unwrap();
        assert_eq!(record.thermal_pressure.as_deref(), Some("Trapping"));
    }

    #[test]
    fn missing_file_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_latest(&dir.path().join("asitop_powermetrics0"));
        assert!(matches!(result, Err(MetricsError::NoData { .. })));
    }

    #[test]
    fn unreadable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_latest(dir.path());
        assert!(matches!(result, Err(MetricsError::Io { .. })));
    }
}
