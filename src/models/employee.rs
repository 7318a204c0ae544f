// File: models/employee.rs

use serde::{Deserialize, Serialize};

/// Employee directory entry. Owned by the account-management side of the
/// system; this service only reads it for display names and the active
/// roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    #[serde(rename = "_id")]
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub is_active: bool,
}
