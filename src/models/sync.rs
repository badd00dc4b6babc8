use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Wire format of `attend_time`, both accepted on push and emitted on pull.
pub const ATTEND_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Body of `PUT /api/v1/sync`.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncPayload {
    #[serde(default)]
    pub data: Vec<SyncEntry>,
}

/// One attendance mark captured on a device. The field is named
/// `invoice_code` on the wire but carries the ticket code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEntry {
    #[serde(rename = "invoice_code")]
    pub ticket_code: String,
    pub attend_time: String,
}

/// A validated mark, ready to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceUpdate {
    pub ticket_code: String,
    pub attend_time: NaiveDateTime,
}

/// Parses `YYYY-MM-DD HH:MM:SS`, rejecting unpadded or otherwise loose input.
pub fn parse_attend_time(value: &str) -> Option<NaiveDateTime> {
    let bytes = value.as_bytes();
    if bytes.len() != 19 {
        return None;
    }

    let shape_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        10 => *b == b' ',
        13 | 16 => *b == b':',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }

    NaiveDateTime::parse_from_str(value, ATTEND_TIME_FORMAT).ok()
}

pub(crate) mod attend_time_format {
    use chrono::NaiveDateTime;
    use serde::Serializer;

    use super::ATTEND_TIME_FORMAT;

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.collect_str(&time.format(ATTEND_TIME_FORMAT)),
            None => serializer.serialize_none(),
        }
    }
}
