use time::{format_description::well_known::Rfc3339, OffsetDateTime};

pub(crate) fn format_offset(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}

/// Human-readable duration used in submission records, e.g. "3m 20s".
pub(crate) fn format_minutes_seconds(total_seconds: u32) -> String {
    format!("{}m {}s", total_seconds / 60, total_seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, PrimitiveDateTime, Time};

    #[test]
    fn format_offset_outputs_rfc3339() {
        let date = Date::from_calendar_date(2025, time::Month::January, 2).unwrap();
        let time = Time::from_hms(10, 20, 30).unwrap();
        let value = PrimitiveDateTime::new(date, time).assume_utc();
        assert_eq!(format_offset(value), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn format_minutes_seconds_splits_duration() {
        assert_eq!(format_minutes_seconds(0), "0m 0s");
        assert_eq!(format_minutes_seconds(59), "0m 59s");
        assert_eq!(format_minutes_seconds(200), "3m 20s");
        assert_eq!(format_minutes_seconds(1800), "30m 0s");
    }
}
