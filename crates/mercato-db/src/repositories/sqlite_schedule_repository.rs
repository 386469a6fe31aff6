//! `SQLite` implementations of the time-tracking and calendar repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use mercato_core::{
    CalendarEvent, CalendarRepository, EventInput, EventRange, RepositoryError, StartTimer,
    TimeEntry, TimeEntryInput, TimeEntryRepository,
};

use super::row_mappers::{
    EVENT_SELECT_COLUMNS, TIME_ENTRY_SELECT_COLUMNS, now, opt_ts_col, row_to_event,
    row_to_time_entry, storage, ts, ts_col, write_error,
};
use super::sqlite_crm_repository::not_found;

pub struct SqliteTimeEntryRepository {
    pool: SqlitePool,
}

impl SqliteTimeEntryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TimeEntryRepository for SqliteTimeEntryRepository {
    async fn list(
        &self,
        owner_id: i64,
        project_id: Option<i64>,
    ) -> Result<Vec<TimeEntry>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r"SELECT {TIME_ENTRY_SELECT_COLUMNS} FROM time_entries
              WHERE owner_id = ? AND (? IS NULL OR project_id = ?)
              ORDER BY started_at DESC, id DESC"
        ))
        .bind(owner_id)
        .bind(project_id)
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_time_entry).collect()
    }

    async fn get(&self, owner_id: i64, id: i64) -> Result<TimeEntry, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {TIME_ENTRY_SELECT_COLUMNS} FROM time_entries WHERE owner_id = ? AND id = ?"
        ))
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?
        .ok_or_else(|| not_found("time entry", id))?;

        row_to_time_entry(&row)
    }

    async fn insert(
        &self,
        owner_id: i64,
        input: &TimeEntryInput,
    ) -> Result<TimeEntry, RepositoryError> {
        let result = sqlx::query(
            r"INSERT INTO time_entries
              (owner_id, project_id, task_id, description, started_at, ended_at, billable,
               hourly_rate_cents, created_at)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(owner_id)
        .bind(input.project_id)
        .bind(input.task_id)
        .bind(&input.description)
        .bind(ts(input.started_at))
        .bind(input.ended_at.map(ts))
        .bind(input.billable)
        .bind(input.hourly_rate_cents)
        .bind(now())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "time entry"))?;

        self.get(owner_id, result.last_insert_rowid()).await
    }

    async fn update(
        &self,
        owner_id: i64,
        id: i64,
        input: &TimeEntryInput,
    ) -> Result<TimeEntry, RepositoryError> {
        let result = sqlx::query(
            r"UPDATE time_entries SET
              project_id = ?, task_id = ?, description = ?, started_at = ?, ended_at = ?,
              billable = ?, hourly_rate_cents = ?
              WHERE owner_id = ? AND id = ?",
        )
        .bind(input.project_id)
        .bind(input.task_id)
        .bind(&input.description)
        .bind(ts(input.started_at))
        .bind(input.ended_at.map(ts))
        .bind(input.billable)
        .bind(input.hourly_rate_cents)
        .bind(owner_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "time entry"))?;

        if result.rows_affected() == 0 {
            return Err(not_found("time entry", id));
        }
        self.get(owner_id, id).await
    }

    async fn delete(&self, owner_id: i64, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM time_entries WHERE owner_id = ? AND id = ?")
            .bind(owner_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(not_found("time entry", id));
        }
        Ok(())
    }

    async fn running(&self, owner_id: i64) -> Result<Option<TimeEntry>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {TIME_ENTRY_SELECT_COLUMNS} FROM time_entries WHERE owner_id = ? AND ended_at IS NULL ORDER BY started_at DESC LIMIT 1"
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.as_ref().map(row_to_time_entry).transpose()
    }

    async fn start(
        &self,
        owner_id: i64,
        timer: &StartTimer,
        started_at: DateTime<Utc>,
    ) -> Result<TimeEntry, RepositoryError> {
        let result = sqlx::query(
            r"INSERT INTO time_entries
              (owner_id, project_id, task_id, description, started_at, billable, created_at)
              VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(owner_id)
        .bind(timer.project_id)
        .bind(timer.task_id)
        .bind(&timer.description)
        .bind(ts(started_at))
        .bind(timer.billable)
        .bind(now())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "time entry"))?;

        self.get(owner_id, result.last_insert_rowid()).await
    }

    async fn stop(
        &self,
        owner_id: i64,
        id: i64,
        ended_at: DateTime<Utc>,
    ) -> Result<TimeEntry, RepositoryError> {
        let result = sqlx::query(
            "UPDATE time_entries SET ended_at = ? WHERE owner_id = ? AND id = ? AND ended_at IS NULL",
        )
        .bind(ts(ended_at))
        .bind(owner_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(not_found("running time entry", id));
        }
        self.get(owner_id, id).await
    }

    async fn billable_minutes_since(
        &self,
        owner_id: i64,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let rows = sqlx::query(
            r"SELECT started_at, ended_at FROM time_entries
              WHERE owner_id = ? AND billable = 1 AND ended_at IS NOT NULL AND started_at >= ?",
        )
        .bind(owner_id)
        .bind(ts(since))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        let mut total = 0;
        for row in &rows {
            let started_at = ts_col(row, "started_at")?;
            let ended_at = opt_ts_col(row, "ended_at")?;
            total += TimeEntry::minutes_between(started_at, ended_at).unwrap_or_default();
        }
        Ok(total)
    }
}

pub struct SqliteCalendarRepository {
    pool: SqlitePool,
}

impl SqliteCalendarRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CalendarRepository for SqliteCalendarRepository {
    async fn list(
        &self,
        owner_id: i64,
        range: &EventRange,
    ) -> Result<Vec<CalendarEvent>, RepositoryError> {
        let from = range.from.map(ts);
        let to = range.to.map(ts);
        let rows = sqlx::query(&format!(
            r"SELECT {EVENT_SELECT_COLUMNS} FROM calendar_events
              WHERE owner_id = ?
                AND (? IS NULL OR ends_at > ?)
                AND (? IS NULL OR starts_at < ?)
              ORDER BY starts_at, id"
        ))
        .bind(owner_id)
        .bind(&from)
        .bind(&from)
        .bind(&to)
        .bind(&to)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_event).collect()
    }

    async fn get(&self, owner_id: i64, id: i64) -> Result<CalendarEvent, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {EVENT_SELECT_COLUMNS} FROM calendar_events WHERE owner_id = ? AND id = ?"
        ))
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?
        .ok_or_else(|| not_found("event", id))?;

        row_to_event(&row)
    }

    async fn insert(
        &self,
        owner_id: i64,
        input: &EventInput,
    ) -> Result<CalendarEvent, RepositoryError> {
        let result = sqlx::query(
            r"INSERT INTO calendar_events
              (owner_id, project_id, title, description, location, starts_at, ends_at, created_at)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(owner_id)
        .bind(input.project_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.location)
        .bind(ts(input.starts_at))
        .bind(ts(input.ends_at))
        .bind(now())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "event"))?;

        self.get(owner_id, result.last_insert_rowid()).await
    }

    async fn update(
        &self,
        owner_id: i64,
        id: i64,
        input: &EventInput,
    ) -> Result<CalendarEvent, RepositoryError> {
        let result = sqlx::query(
            r"UPDATE calendar_events SET
              project_id = ?, title = ?, description = ?, location = ?, starts_at = ?, ends_at = ?
              WHERE owner_id = ? AND id = ?",
        )
        .bind(input.project_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.location)
        .bind(ts(input.starts_at))
        .bind(ts(input.ends_at))
        .bind(owner_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "event"))?;

        if result.rows_affected() == 0 {
            return Err(not_found("event", id));
        }
        self.get(owner_id, id).await
    }

    async fn delete(&self, owner_id: i64, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM calendar_events WHERE owner_id = ? AND id = ?")
            .bind(owner_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(not_found("event", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::TestDb;
    use chrono::{Duration, TimeZone};
    use mercato_core::{NewUser, UserRepository, UserRole};

    async fn owner(db: &TestDb) -> i64 {
        db.user_repository()
            .insert(&NewUser {
                email: "t@x.co".into(),
                password_hash: "h".into(),
                name: "T".into(),
                role: UserRole::Freelancer,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_timer_start_and_stop() {
        let db = TestDb::new().await.unwrap();
        let owner = owner(&db).await;
        let entries = db.time_entry_repository();
        let started_at = Utc::now() - Duration::minutes(90);

        let entry = entries
            .start(owner, &StartTimer::default(), started_at)
            .await
            .unwrap();
        assert!(entry.is_running());
        assert_eq!(entry.duration_minutes, None);
        assert_eq!(entries.running(owner).await.unwrap().unwrap().id, entry.id);

        let stopped = entries
            .stop(owner, entry.id, started_at + Duration::minutes(90))
            .await
            .unwrap();
        assert_eq!(stopped.duration_minutes, Some(90));
        assert!(entries.running(owner).await.unwrap().is_none());

        assert!(matches!(
            entries.stop(owner, entry.id, Utc::now()).await.unwrap_err(),
            RepositoryError::NotFound(_)
        ));
        assert_eq!(
            entries
                .billable_minutes_since(owner, started_at - Duration::minutes(1))
                .await
                .unwrap(),
            90
        );
    }

    #[tokio::test]
    async fn test_event_range_overlap() {
        let db = TestDb::new().await.unwrap();
        let owner = owner(&db).await;
        let events = db.calendar_repository();
        let day = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap();

        for (title, offset) in [("early", 0), ("late", 5)] {
            events
                .insert(
                    owner,
                    &EventInput {
                        project_id: None,
                        title: title.into(),
                        description: None,
                        location: None,
                        starts_at: day + Duration::hours(offset),
                        ends_at: day + Duration::hours(offset + 1),
                    },
                )
                .await
                .unwrap();
        }

        let all = events.list(owner, &EventRange::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let window = EventRange {
            from: Some(day + Duration::minutes(30)),
            to: Some(day + Duration::hours(2)),
        };
        let overlapping = events.list(owner, &window).await.unwrap();
        assert_eq!(overlapping.len(), 1);
        assert_eq!(overlapping[0].title, "early");
    }

    #[tokio::test]
    async fn test_event_end_must_follow_start() {
        let db = TestDb::new().await.unwrap();
        let owner = owner(&db).await;
        let at = Utc::now();

        let err = db
            .calendar_repository()
            .insert(
                owner,
                &EventInput {
                    project_id: None,
                    title: "Backwards".into(),
                    description: None,
                    location: None,
                    starts_at: at,
                    ends_at: at,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Constraint(_)));
    }
}
