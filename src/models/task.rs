// File: models/task.rs

use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a task. Late, Completed and Cancelled are terminal
/// for the overdue sweep: once a task is in one of those, the sweep never
/// rewrites it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Late,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "InProgress",
            TaskStatus::Late => "Late",
            TaskStatus::Completed => "Completed",
            TaskStatus::Cancelled => "Cancelled",
        }
    }

    /// Statuses the overdue sweep must never overwrite.
    pub fn terminal_statuses() -> [&'static str; 3] {
        [
            TaskStatus::Late.as_str(),
            TaskStatus::Completed.as_str(),
            TaskStatus::Cancelled.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub assignee_id: Option<String>,
    pub status: TaskStatus,
    pub start_at: Option<BsonDateTime>,
    pub end_at: Option<BsonDateTime>,
    pub created_at: BsonDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_serializes_as_its_filter_string() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Late,
            TaskStatus::Completed,
            TaskStatus::Cancelled,
        ] {
            let value = serde_json::to_value(status).unwrap();
            assert_eq!(value, json!(status.as_str()));
        }
    }

    #[test]
    fn terminal_statuses_do_not_include_open_states() {
        let terminal = TaskStatus::terminal_statuses();
        assert_eq!(terminal, ["Late", "Completed", "Cancelled"]);
        assert!(!terminal.contains(&TaskStatus::Pending.as_str()));
        assert!(!terminal.contains(&TaskStatus::InProgress.as_str()));
    }
}
