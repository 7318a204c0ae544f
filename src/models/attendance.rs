// File: models/attendance.rs

use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Daily attendance state. Stored as the plain variant name, so the strings
/// used in query filters come from `as_str` rather than hand-typed literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Pending,
    Present,
    Late,
    Absent,
    Leave,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Pending => "Pending",
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Late => "Late",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::Leave => "Leave",
        }
    }
}

/// One row per employee per work day in the `attendance` collection.
/// `work_date` is a `YYYY-MM-DD` string; the pair (user_id, work_date)
/// is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub work_date: String,
    pub check_in: Option<BsonDateTime>,
    pub check_out: Option<BsonDateTime>,
    pub status: AttendanceStatus,
    pub note: String,
    pub overtime_hours: Option<f64>,
}

impl AttendanceRecord {
    /// The placeholder row created for each active employee at the start of
    /// a work day, before anyone has checked in.
    pub fn pending(user_id: &str, work_date: &str) -> Self {
        AttendanceRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            work_date: work_date.to_string(),
            check_in: None,
            check_out: None,
            status: AttendanceStatus::Pending,
            note: String::new(),
            overtime_hours: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, from_document, Bson};
    use serde_json::json;

    #[test]
    fn status_serializes_as_its_filter_string() {
        for status in [
            AttendanceStatus::Pending,
            AttendanceStatus::Present,
            AttendanceStatus::Late,
            AttendanceStatus::Absent,
            AttendanceStatus::Leave,
        ] {
            let value = serde_json::to_value(status).unwrap();
            assert_eq!(value, json!(status.as_str()));
        }
    }

    #[test]
    fn pending_row_starts_empty() {
        let record = AttendanceRecord::pending("emp-3", "2026-08-25");
        assert_eq!(record.user_id, "emp-3");
        assert_eq!(record.work_date, "2026-08-25");
        assert_eq!(record.status, AttendanceStatus::Pending);
        assert!(record.check_in.is_none());
        assert!(record.check_out.is_none());
        assert!(record.note.is_empty());
        assert!(record.overtime_hours.is_none());
    }

    // The check-in flow owns this collection and may write statuses this
    // enum does not know. Existence checks must therefore query by key
    // instead of reading rows through this type.
    #[test]
    fn rows_with_unknown_status_fail_typed_reads() {
        let row = doc! {
            "_id": "att-1",
            "user_id": "emp-3",
            "work_date": "2026-08-24",
            "check_in": Bson::Null,
            "check_out": Bson::Null,
            "status": "OnSite",
            "note": "",
            "overtime_hours": Bson::Null,
        };
        assert!(from_document::<AttendanceRecord>(row).is_err());
    }
}
