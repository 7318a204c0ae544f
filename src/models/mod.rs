// File: models/mod.rs

pub mod attendance;
pub mod employee;
pub mod group_chat;
pub mod message;
pub mod task;

pub use attendance::{AttendanceRecord, AttendanceStatus};
pub use employee::Employee;
pub use group_chat::GroupChat;
pub use message::MessageRecord;
pub use task::{TaskItem, TaskStatus};
