use serde::Serialize;

use super::record::Record;
use super::sentence::{split_line, Line};
use super::{check_buffer, LogError};

/// Per-decode counters. Record-level problems land here instead of failing the decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    pub lines: usize,
    pub records: usize,
    pub skipped: usize,
    pub checksum_failures: usize,
    pub malformed: usize,
    pub unknown: usize,
}

/// Lazy record stream over a raw log buffer.
#[derive(Debug)]
pub struct Records<'a> {
    rest: &'a [u8],
    stats: DecodeStats,
}

/// Checks the buffer limits and returns a lazy record iterator.
pub fn decode(buffer: &[u8]) -> Result<Records<'_>, LogError> {
    check_buffer(buffer)?;
    Ok(Records::new(buffer))
}

impl<'a> Records<'a> {
    /// Iterates without the buffer-level checks.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            rest: buffer,
            stats: DecodeStats::default(),
        }
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    fn next_line(&mut self) -> Option<&'a [u8]> {
        if self.rest.is_empty() {
            return None;
        }
        let line = match self.rest.iter().position(|&b| b == b'\n') {
            Some(end) => {
                let line = &self.rest[..end];
                self.rest = &self.rest[end + 1..];
                line
            }
            None => std::mem::take(&mut self.rest),
        };
        Some(line)
    }
}

impl Iterator for Records<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        while let Some(raw) = self.next_line() {
            self.stats.lines += 1;
            let Ok(text) = std::str::from_utf8(raw) else {
                self.stats.skipped += 1;
                continue;
            };

            let sentence = match split_line(text) {
                Line::Sentence(sentence) => sentence,
                Line::BadChecksum => {
                    self.stats.checksum_failures += 1;
                    continue;
                }
                Line::Blank | Line::Foreign => {
                    self.stats.skipped += 1;
                    continue;
                }
            };

            match Record::from_sentence(&sentence) {
                Some(record) => {
                    if matches!(record, Record::Unknown { .. }) {
                        self.stats.unknown += 1;
                    }
                    self.stats.records += 1;
                    return Some(record);
                }
                None => {
                    log::debug!("Malformed {} sentence on line {}", sentence.tag, self.stats.lines);
                    self.stats.malformed += 1;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{pad, sentence};

    #[test]
    fn test_decode_rejects_buffer_limits() {
        assert_eq!(decode(b"").unwrap_err(), LogError::Empty);
        assert_eq!(decode(b"$PSFC").unwrap_err(), LogError::TooSmall);
        let huge = vec![b' '; super::super::MAX_LOG_BYTES + 1];
        assert_eq!(decode(&huge).unwrap_err(), LogError::TooLarge);
    }

    #[test]
    fn test_bad_lines_are_counted_not_fatal() {
        let mut text = String::new();
        text.push_str(&sentence("PVER,2,1.4.0"));
        text.push('\n');
        text.push_str("$PSFC,350*00\n");
        text.push_str("garbage line\n\n");
        text.push_str(&sentence("PENV,oops,1,2,3"));
        text.push('\n');
        text.push_str(&sentence("PFUT,7"));
        text.push('\n');
        text.push_str(&sentence("PSFC,350"));
        let text = pad(text);

        let mut records = decode(text.as_bytes()).unwrap();
        let decoded: Vec<Record> = records.by_ref().collect();
        assert_eq!(decoded.len(), 3);
        assert!(matches!(decoded[0], Record::Version { .. }));
        assert!(matches!(decoded[1], Record::Unknown { .. }));
        assert!(matches!(decoded[2], Record::SurfaceReference { altitude_ft } if altitude_ft == 350.0));

        let stats = records.stats();
        assert_eq!(stats.records, 3);
        assert_eq!(stats.checksum_failures, 1);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.unknown, 1);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let mut buffer = vec![0xff, 0xfe, b'\n'];
        buffer.extend_from_slice(pad(sentence("PSFC,12")).as_bytes());
        let records: Vec<Record> = decode(&buffer).unwrap().collect();
        assert_eq!(records.len(), 1);
    }
}
