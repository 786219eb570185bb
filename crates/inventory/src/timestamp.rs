//! Canonicalization of caller-supplied instants.
//!
//! Every persisted movement carries its `occurred_at` in one fixed offset (the
//! store's reporting offset) so date-range filters compare like with like no
//! matter where a submission came from.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use warehouse_core::{DomainError, DomainResult};

/// Western Indonesia Time (WIB), the default reporting offset.
pub const DEFAULT_REPORTING_OFFSET_SECS: i32 = 7 * 3600;

const WALL_CLOCK_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// An instant as a caller supplied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalInstant {
    /// Wall-clock text such as `2024-01-15T10:30` (a `datetime-local` form
    /// field). An RFC 3339 offset inside the text wins over `assumed_offset`;
    /// with neither, the normalizer's reporting offset is assumed.
    WallClock {
        text: String,
        #[serde(default, with = "offset_text::option")]
        assumed_offset: Option<FixedOffset>,
    },
    /// An already-resolved instant.
    Exact(DateTime<FixedOffset>),
}

impl LocalInstant {
    pub fn wall_clock(text: impl Into<String>) -> Self {
        LocalInstant::WallClock {
            text: text.into(),
            assumed_offset: None,
        }
    }

    pub fn wall_clock_at(text: impl Into<String>, offset: FixedOffset) -> Self {
        LocalInstant::WallClock {
            text: text.into(),
            assumed_offset: Some(offset),
        }
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for LocalInstant {
    fn from(value: DateTime<Tz>) -> Self {
        LocalInstant::Exact(value.fixed_offset())
    }
}

/// Converts caller-local instants to the canonical reporting offset.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimestampNormalizer {
    reporting_offset: FixedOffset,
}

impl Default for TimestampNormalizer {
    fn default() -> Self {
        // 7h is always within FixedOffset's +-24h bound.
        let offset = FixedOffset::east_opt(DEFAULT_REPORTING_OFFSET_SECS).unwrap_or(utc());
        Self::new(offset)
    }
}

impl TimestampNormalizer {
    pub fn new(reporting_offset: FixedOffset) -> Self {
        Self { reporting_offset }
    }

    pub fn reporting_offset(&self) -> FixedOffset {
        self.reporting_offset
    }

    /// Resolve `instant` and express it in the reporting offset.
    ///
    /// Pure. Fails only with `Validation` when the text cannot be parsed.
    pub fn normalize(&self, instant: &LocalInstant) -> DomainResult<DateTime<FixedOffset>> {
        let resolved = match instant {
            LocalInstant::Exact(at) => *at,
            LocalInstant::WallClock {
                text,
                assumed_offset,
            } => {
                let offset = assumed_offset.unwrap_or(self.reporting_offset);
                parse_wall_clock(text.trim(), offset)?
            }
        };
        Ok(resolved.with_timezone(&self.reporting_offset))
    }

    /// The current instant in the reporting offset.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.reporting_offset)
    }

    /// Today's calendar date in the reporting offset.
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

fn parse_wall_clock(text: &str, offset: FixedOffset) -> DomainResult<DateTime<FixedOffset>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Ok(at);
    }

    let naive = WALL_CLOCK_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| DomainError::validation(format!("unparseable timestamp '{text}'")))?;

    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| DomainError::validation(format!("ambiguous timestamp '{text}'")))
}

/// Parse a UTC offset written as `+07:00`, `-0330`, `+7` or `Z`.
///
/// Hours run 0..=23 and minutes 0..=59; anything else is `Validation`.
pub fn parse_utc_offset(value: &str) -> DomainResult<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return Ok(utc());
    }

    let invalid = || DomainError::validation(format!("invalid UTC offset '{value}'"));

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => return Err(invalid()),
    };
    // Digits and one optional colon only, which also keeps the slicing below
    // on ASCII boundaries.
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return Err(invalid());
    }

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Serde adapter writing a [`FixedOffset`] as text (`+07:00`).
pub mod offset_text {
    use chrono::FixedOffset;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(offset: &FixedOffset, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(offset)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FixedOffset, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_utc_offset(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::FixedOffset;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(offset: &Option<FixedOffset>, serializer: S) -> Result<S::Ok, S::Error> {
            match offset {
                Some(offset) => serializer.collect_str(offset),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<FixedOffset>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| super::super::parse_utc_offset(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
