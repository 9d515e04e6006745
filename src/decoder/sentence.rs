/// One checksummed sentence, borrowed from the raw buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence<'a> {
    pub tag: &'a str,
    pub fields: Vec<&'a str>,
}

impl<'a> Sentence<'a> {
    /// Field by index, `None` when missing or empty.
    pub fn field(&self, index: usize) -> Option<&'a str> {
        self.fields
            .get(index)
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
    }

    pub fn f64_at(&self, index: usize) -> Option<f64> {
        self.field(index)?.parse().ok()
    }

    pub fn u64_at(&self, index: usize) -> Option<u64> {
        self.field(index)?.parse().ok()
    }
}

/// Classification of one raw line.
#[derive(Debug, Clone, PartialEq)]
pub enum Line<'a> {
    Blank,
    /// No `$` start marker.
    Foreign,
    /// Missing or mismatching `*CK` trailer.
    BadChecksum,
    Sentence(Sentence<'a>),
}

/// XOR of every byte in `payload` (the bytes between `$` and `*`).
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, b| acc ^ b)
}

pub fn split_line(line: &str) -> Line<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Line::Blank;
    }
    let Some(body) = line.strip_prefix('$') else {
        return Line::Foreign;
    };

    let Some(star) = body.rfind('*') else {
        return Line::BadChecksum;
    };
    let (payload, trailer) = (&body[..star], &body[star + 1..]);
    if trailer.len() != 2 {
        return Line::BadChecksum;
    }
    match u8::from_str_radix(trailer, 16) {
        Ok(expected) if expected == checksum(payload.as_bytes()) => {}
        _ => return Line::BadChecksum,
    }

    let mut parts = payload.split(',');
    let tag = parts.next().unwrap_or_default().trim();
    if tag.is_empty() {
        return Line::Foreign;
    }
    Line::Sentence(Sentence {
        tag,
        fields: parts.collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::sentence;

    #[test]
    fn test_checksum_matches_nmea_reference() {
        // Well-known GGA example from the NMEA documentation
        let line = "$GPGGA,092750.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,*76";
        assert!(matches!(split_line(line), Line::Sentence(_)));
    }

    #[test]
    fn test_split_fields() {
        let line = sentence("PENV,1200,101325,1500.5,-120,21.5");
        match split_line(&line) {
            Line::Sentence(s) => {
                assert_eq!(s.tag, "PENV");
                assert_eq!(s.fields.len(), 5);
                assert_eq!(s.u64_at(0), Some(1200));
                assert_eq!(s.f64_at(2), Some(1500.5));
                assert_eq!(s.field(5), None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bad_checksum() {
        assert_eq!(split_line("$PENV,1200,1*00"), Line::BadChecksum);
        assert_eq!(split_line("$PENV,1200,1"), Line::BadChecksum);
        assert_eq!(split_line("$PENV,1200,1*ZZ"), Line::BadChecksum);
    }

    #[test]
    fn test_blank_and_foreign() {
        assert_eq!(split_line("   \r"), Line::Blank);
        assert_eq!(split_line("# comment line"), Line::Foreign);
    }

    #[test]
    fn test_crlf_is_accepted() {
        let line = format!("{}\r", sentence("PSFC,350"));
        assert!(matches!(split_line(&line), Line::Sentence(_)));
    }
}
