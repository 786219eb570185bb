use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use warehouse_core::{DomainError, DomainResult, ValueObject};

/// Inclusive `[start, end]` window on `occurred_at`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RangeBounds")]
pub struct DateRange {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl DateRange {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> DomainResult<Self> {
        if start > end {
            return Err(DomainError::validation(format!(
                "date range start ({start}) is after end ({end})"
            )));
        }
        Ok(Self { start, end })
    }

    /// A single instant (`[t, t]`).
    pub fn at(instant: DateTime<FixedOffset>) -> Self {
        Self {
            start: instant,
            end: instant,
        }
    }

    /// Whole calendar days `start_date 00:00` through `end_date 23:59:59.999999999`
    /// in `offset`.
    pub fn for_days(start_date: NaiveDate, end_date: NaiveDate, offset: FixedOffset) -> DomainResult<Self> {
        let start = start_date
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| offset.from_local_datetime(&naive).single())
            .ok_or_else(|| DomainError::validation(format!("invalid start date {start_date}")))?;
        let end = end_date
            .and_hms_nano_opt(23, 59, 59, 999_999_999)
            .and_then(|naive| offset.from_local_datetime(&naive).single())
            .ok_or_else(|| DomainError::validation(format!("invalid end date {end_date}")))?;
        Self::new(start, end)
    }

    pub fn for_day(date: NaiveDate, offset: FixedOffset) -> DomainResult<Self> {
        Self::for_days(date, date, offset)
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    pub fn contains(&self, instant: &DateTime<FixedOffset>) -> bool {
        self.start <= *instant && *instant <= self.end
    }
}

impl ValueObject for DateRange {}

#[derive(Deserialize)]
struct RangeBounds {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl TryFrom<RangeBounds> for DateRange {
    type Error = DomainError;

    fn try_from(bounds: RangeBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.start, bounds.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wib() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    #[test]
    fn bounds_are_inclusive() {
        let t = wib().with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let range = DateRange::at(t);
        assert!(range.contains(&t));
        assert!(!range.contains(&(t + chrono::Duration::seconds(1))));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let t = wib().with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let err = DateRange::new(t, t - chrono::Duration::minutes(1)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn reversed_range_cannot_be_deserialized() {
        let t = wib().with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let range = DateRange::new(t, t + chrono::Duration::hours(1)).unwrap();
        let json = serde_json::to_value(range).unwrap();
        assert_eq!(serde_json::from_value::<DateRange>(json.clone()).unwrap(), range);

        let reversed = serde_json::json!({ "start": json["end"], "end": json["start"] });
        assert!(serde_json::from_value::<DateRange>(reversed).is_err());
    }

    #[test]
    fn day_range_covers_local_calendar_day() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let range = DateRange::for_day(day, wib()).unwrap();
        let late_evening = wib().with_ymd_and_hms(2024, 1, 15, 23, 59, 59).unwrap();
        // 2024-01-15 17:30 UTC is already the 16th in WIB.
        let next_day_local = chrono::Utc.with_ymd_and_hms(2024, 1, 15, 17, 30, 0).unwrap().fixed_offset();
        assert!(range.contains(&late_evening));
        assert!(!range.contains(&next_day_local));
    }
}
