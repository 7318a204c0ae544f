// File: scheduler.rs
//
// Hourly reconciliation over attendance and task state. Every pass is an
// idempotent filter over the database, so a crashed or skipped cycle is
// simply caught up by the next one.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, Timelike, Utc};
use futures_util::StreamExt;
use log::{debug, error, info};
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime, Document};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::db::MongoDB;
use crate::models::{AttendanceRecord, AttendanceStatus, Employee, TaskItem, TaskStatus};

pub const WAKE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Hour (UTC) at which the previous day is closed out.
pub const DAY_BOUNDARY_HOUR: u32 = 0;

/// Runs the reconciliation loop until `shutdown` fires.
///
/// Spawned exactly once at startup. The loop races the interval tick
/// against cancellation, so shutdown is observed at every sleep boundary
/// instead of only after the next full hour.
pub async fn run(db: Arc<MongoDB>, shutdown: CancellationToken) {
    let mut ticker = interval(WAKE_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        "Reconciliation job started (every {}s)",
        WAKE_INTERVAL.as_secs()
    );
    loop {
        tokio::select! {
            _ = ticker.tick() => run_cycle(&db, Utc::now()).await,
            _ = shutdown.cancelled() => {
                info!("Reconciliation job stopping");
                break;
            }
        }
    }
}

/// One wake-up: the absence pass only at the day boundary, the seeding and
/// overdue passes every hour. A failed pass is logged and retried wholesale
/// on the next cycle.
async fn run_cycle(db: &MongoDB, now: DateTime<Utc>) {
    if at_day_boundary(now) {
        if let Err(e) = close_out_previous_day(db, now).await {
            error!("Absence pass failed: {}", e);
        }
    }
    if let Err(e) = seed_daily_attendance(db, now).await {
        error!("Attendance seeding pass failed: {}", e);
    }
    if let Err(e) = flag_overdue_tasks(db, now).await {
        error!("Overdue task pass failed: {}", e);
    }
}

fn at_day_boundary(now: DateTime<Utc>) -> bool {
    now.hour() == DAY_BOUNDARY_HOUR
}

/// Marks yesterday's unfinished attendance as absent: rows still Pending,
/// or checked in but never out. Days that were closed properly, and leave
/// days, fall outside the filter, so re-running the pass changes nothing.
async fn close_out_previous_day(db: &MongoDB, now: DateTime<Utc>) -> mongodb::error::Result<()> {
    let work_date = previous_work_date(now);
    let result = db
        .db
        .collection::<AttendanceRecord>("attendance")
        .update_many(
            unfinished_day_filter(&work_date),
            doc! { "$set": { "status": AttendanceStatus::Absent.as_str() } },
        )
        .await?;
    if result.modified_count > 0 {
        info!(
            "Marked {} attendance records for {} as absent",
            result.modified_count, work_date
        );
    } else {
        debug!("No unfinished attendance for {}", work_date);
    }
    Ok(())
}

/// Ensures every active employee has an attendance row for today, creating
/// Pending rows where none exist. The existence check and the insert run
/// back to back; that is safe only because a single job instance runs per
/// deployment.
async fn seed_daily_attendance(db: &MongoDB, now: DateTime<Utc>) -> mongodb::error::Result<()> {
    let work_date = current_work_date(now);
    let employees = db.db.collection::<Employee>("employees");
    let attendance = db.db.collection::<AttendanceRecord>("attendance");

    let mut cursor = employees.find(doc! { "is_active": true }).await?;
    let mut created = 0;
    while let Some(employee) = cursor.next().await {
        let employee = employee?;
        // Existence check by key only: the rows belong to the check-in
        // flow and their shape may drift from this model.
        let existing = attendance
            .count_documents(attendance_key(&employee.id, &work_date))
            .await?;
        if existing == 0 {
            attendance
                .insert_one(AttendanceRecord::pending(&employee.id, &work_date))
                .await?;
            created += 1;
        }
    }
    if created > 0 {
        info!("Seeded {} attendance records for {}", created, work_date);
    }
    Ok(())
}

/// Flags tasks whose deadline has passed. Late, Completed and Cancelled
/// tasks sit outside the filter, so the transition happens at most once and
/// never resurrects a finished task. Tasks without a deadline are never
/// touched.
async fn flag_overdue_tasks(db: &MongoDB, now: DateTime<Utc>) -> mongodb::error::Result<()> {
    let result = db
        .db
        .collection::<TaskItem>("tasks")
        .update_many(
            overdue_task_filter(BsonDateTime::from_millis(now.timestamp_millis())),
            doc! { "$set": { "status": TaskStatus::Late.as_str() } },
        )
        .await?;
    if result.modified_count > 0 {
        info!("Marked {} overdue tasks as late", result.modified_count);
    }
    Ok(())
}

fn previous_work_date(now: DateTime<Utc>) -> String {
    (now.date_naive() - Days::new(1)).format("%Y-%m-%d").to_string()
}

fn current_work_date(now: DateTime<Utc>) -> String {
    now.date_naive().format("%Y-%m-%d").to_string()
}

/// There is exactly one attendance row per employee per work date; every
/// existence check goes through this key.
fn attendance_key(user_id: &str, work_date: &str) -> Document {
    doc! { "user_id": user_id, "work_date": work_date }
}

fn unfinished_day_filter(work_date: &str) -> Document {
    doc! {
        "work_date": work_date,
        "$or": [
            { "status": AttendanceStatus::Pending.as_str() },
            { "check_in": { "$ne": Bson::Null }, "check_out": Bson::Null },
        ],
    }
}

fn overdue_task_filter(now: BsonDateTime) -> Document {
    doc! {
        "end_at": { "$ne": Bson::Null, "$lt": now },
        "status": { "$nin": TaskStatus::terminal_statuses().to_vec() },
    }
}
