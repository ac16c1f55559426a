//! Opaque, strictly increasing position tokens for the event log.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Position of one event in the telemetry log.
///
/// Cursors are minted from a monotonic per-process counter, so ordering
/// and uniqueness hold regardless of wall-clock behavior. On the wire a
/// cursor is an opaque, zero-padded decimal string whose lexicographic
/// order matches its numeric order; clients must treat it as opaque and
/// only ever hand it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor(u64);

impl Cursor {
    /// Creates a cursor from a raw sequence number.
    ///
    /// Minting lives with the event log's counter; this constructor exists
    /// for the log and for tests.
    pub fn from_sequence(sequence: u64) -> Self {
        Self(sequence)
    }

    /// Returns the raw sequence number.
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:020}", self.0)
    }
}

/// Failure to parse a cursor token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid cursor token")]
pub struct ParseCursorError;

impl FromStr for Cursor {
    type Err = ParseCursorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Cursor).map_err(|_| ParseCursorError)
    }
}

impl Serialize for Cursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn cursor_ordering_follows_sequence() {
        let a = Cursor::from_sequence(1);
        let b = Cursor::from_sequence(2);
        assert!(a < b);
        assert_ne!(a, b);
    }

    #[test]
    fn cursor_displays_zero_padded() {
        let cursor = Cursor::from_sequence(42);
        assert_eq!(cursor.to_string(), "00000000000000000042");
    }

    #[test]
    fn cursor_parses_its_own_display() {
        let cursor = Cursor::from_sequence(9000);
        let parsed: Cursor = cursor.to_string().parse().unwrap();
        assert_eq!(cursor, parsed);
    }

    #[test]
    fn cursor_parse_rejects_garbage() {
        assert!("not-a-cursor".parse::<Cursor>().is_err());
        assert!("".parse::<Cursor>().is_err());
    }

    #[test]
    fn cursor_serializes_as_string() {
        let cursor = Cursor::from_sequence(7);
        let json = serde_json::to_string(&cursor).unwrap();
        assert_eq!(json, "\"00000000000000000007\"");

        let restored: Cursor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cursor);
    }

    proptest! {
        #[test]
        fn display_parse_round_trips(seq in any::<u64>()) {
            let cursor = Cursor::from_sequence(seq);
            let parsed: Cursor = cursor.to_string().parse().unwrap();
            prop_assert_eq!(cursor, parsed);
        }

        #[test]
        fn lexicographic_order_matches_numeric_order(a in any::<u64>(), b in any::<u64>()) {
            let (ca, cb) = (Cursor::from_sequence(a), Cursor::from_sequence(b));
            prop_assert_eq!(
                ca.to_string().cmp(&cb.to_string()),
                a.cmp(&b)
            );
        }
    }
}
