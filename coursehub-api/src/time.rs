use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::Time;

const NAIVE_ISO: &str = "%Y-%m-%dT%H:%M:%S%.f";
// the users table renders its own dates this way
const BACKEND_DISPLAY: &str = "%d-%m-%Y %H:%M:%S";

const DISPLAY: &str = "%H:%M:%S %d/%m/%Y";
const DISPLAY_DATE: &str = "%d/%m/%Y";

/// Timestamp exactly as the backend sent it
///
/// Parsing is deferred: an unparseable value stays around untouched, sorts
/// after every parseable one and displays as a placeholder.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct Timestamp(pub String);

impl Timestamp {
    pub fn from_time(t: Time) -> Timestamp {
        Timestamp(t.to_rfc3339())
    }

    pub fn parse(&self) -> Option<Time> {
        let s = self.0.trim();
        if let Ok(t) = DateTime::parse_from_rfc3339(s) {
            return Some(t.with_timezone(&Utc));
        }
        if let Ok(t) = NaiveDateTime::parse_from_str(s, NAIVE_ISO) {
            return Some(Utc.from_utc_datetime(&t));
        }
        if let Ok(t) = NaiveDateTime::parse_from_str(s, BACKEND_DISPLAY) {
            return Some(Utc.from_utc_datetime(&t));
        }
        None
    }

    /// Ascending by time, unparseable last
    pub fn sort_key(&self) -> (bool, Option<Time>) {
        let t = self.parse();
        (t.is_none(), t)
    }

    pub fn display_or(&self, placeholder: &str) -> String {
        match self.parse() {
            Some(t) => t.format(DISPLAY).to_string(),
            None => placeholder.to_string(),
        }
    }

    pub fn display_date_or(&self, placeholder: &str) -> String {
        match self.parse() {
            Some(t) => t.format(DISPLAY_DATE).to_string(),
            None => placeholder.to_string(),
        }
    }
}

/// Turns a form's `YYYY-MM-DD` into the ISO string the backend stores
pub(crate) fn date_to_iso(date: &str) -> Option<String> {
    let d = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let t = Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?);
    Some(t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}
