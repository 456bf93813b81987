use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

// Offset-carrying shapes seen in FNSPID-style news dumps ("2020-06-05 10:30:54-04:00").
const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// A parsed point in time, keeping whatever precision and zone the source carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    Date(NaiveDate),
    Naive(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
}

impl Stamp {
    /// Date-only truncation in the zone the value already carries. No conversion.
    pub fn calendar_date(&self) -> NaiveDate {
        match self {
            Stamp::Date(d) => *d,
            Stamp::Naive(dt) => dt.date(),
            Stamp::Zoned(dt) => dt.date_naive(),
        }
    }

    /// Wall-clock ordering key, consistent with [`Stamp::calendar_date`].
    pub fn sort_key(&self) -> NaiveDateTime {
        match self {
            Stamp::Date(d) => d.and_time(NaiveTime::MIN),
            Stamp::Naive(dt) => *dt,
            Stamp::Zoned(dt) => dt.naive_local(),
        }
    }

    /// Naive values are interpreted as wall-clock time in `tz`; zoned values are
    /// converted to `tz`.
    pub fn localize(self, tz: FixedOffset) -> Stamp {
        let naive = match self {
            Stamp::Zoned(dt) => return Stamp::Zoned(dt.with_timezone(&tz)),
            Stamp::Date(d) => d.and_time(NaiveTime::MIN),
            Stamp::Naive(dt) => dt,
        };
        // A fixed offset has no gaps or folds, so the mapping is always single.
        match tz.from_local_datetime(&naive).single() {
            Some(dt) => Stamp::Zoned(dt),
            None => self,
        }
    }
}

/// Best-effort timestamp parsing. `None` means the text is not a recognizable date.
pub fn parse_stamp(raw: &str) -> Option<Stamp> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(Stamp::Zoned(dt));
    }
    for fmt in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(Stamp::Zoned(dt));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Stamp::Naive(dt));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(Stamp::Date(d));
        }
    }

    None
}
