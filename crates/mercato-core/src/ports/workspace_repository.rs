//! Workspace (CRM) repository trait definitions.
//!
//! Every method is scoped to an `owner_id`. A row that exists but belongs
//! to another owner is reported as `RepositoryError::NotFound`, never as a
//! permission error, so callers cannot probe for foreign ids.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::RepositoryError;
use crate::domain::{
    CalendarEvent, Client, ClientInput, EventInput, EventRange, Invoice, InvoiceInput,
    InvoiceStatus, Project, ProjectInput, ProjectStatus, StartTimer, Task, TaskInput, TimeEntry,
    TimeEntryInput,
};

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn list(&self, owner_id: i64) -> Result<Vec<Client>, RepositoryError>;

    async fn get(&self, owner_id: i64, id: i64) -> Result<Client, RepositoryError>;

    async fn insert(&self, owner_id: i64, input: &ClientInput) -> Result<Client, RepositoryError>;

    async fn update(
        &self,
        owner_id: i64,
        id: i64,
        input: &ClientInput,
    ) -> Result<Client, RepositoryError>;

    async fn delete(&self, owner_id: i64, id: i64) -> Result<(), RepositoryError>;

    async fn count(&self, owner_id: i64) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn list(&self, owner_id: i64) -> Result<Vec<Project>, RepositoryError>;

    async fn get(&self, owner_id: i64, id: i64) -> Result<Project, RepositoryError>;

    async fn insert(&self, owner_id: i64, input: &ProjectInput)
    -> Result<Project, RepositoryError>;

    async fn update(
        &self,
        owner_id: i64,
        id: i64,
        input: &ProjectInput,
    ) -> Result<Project, RepositoryError>;

    async fn delete(&self, owner_id: i64, id: i64) -> Result<(), RepositoryError>;

    async fn count_with_status(
        &self,
        owner_id: i64,
        status: ProjectStatus,
    ) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// List tasks, optionally restricted to one project.
    async fn list(
        &self,
        owner_id: i64,
        project_id: Option<i64>,
    ) -> Result<Vec<Task>, RepositoryError>;

    async fn get(&self, owner_id: i64, id: i64) -> Result<Task, RepositoryError>;

    async fn insert(&self, owner_id: i64, input: &TaskInput) -> Result<Task, RepositoryError>;

    async fn update(
        &self,
        owner_id: i64,
        id: i64,
        input: &TaskInput,
    ) -> Result<Task, RepositoryError>;

    async fn delete(&self, owner_id: i64, id: i64) -> Result<(), RepositoryError>;

    /// Tasks that are not `DONE`.
    async fn count_open(&self, owner_id: i64) -> Result<i64, RepositoryError>;
}

/// Repository for invoices and their line items.
///
/// Line amounts are derived from quantity and unit price on write; totals
/// are derived from the items on read.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn list(&self, owner_id: i64) -> Result<Vec<Invoice>, RepositoryError>;

    async fn get(&self, owner_id: i64, id: i64) -> Result<Invoice, RepositoryError>;

    /// Insert an invoice with the given number, replacing `input.number`.
    ///
    /// Returns `Err(RepositoryError::AlreadyExists)` if the owner already
    /// uses that number.
    async fn insert(
        &self,
        owner_id: i64,
        number: &str,
        input: &InvoiceInput,
    ) -> Result<Invoice, RepositoryError>;

    /// Replace header fields and all line items.
    async fn update(
        &self,
        owner_id: i64,
        id: i64,
        number: &str,
        input: &InvoiceInput,
    ) -> Result<Invoice, RepositoryError>;

    async fn set_status(
        &self,
        owner_id: i64,
        id: i64,
        status: InvoiceStatus,
    ) -> Result<Invoice, RepositoryError>;

    async fn delete(&self, owner_id: i64, id: i64) -> Result<(), RepositoryError>;

    /// Number of invoices the owner has issued in `year`, by issue date.
    async fn count_for_year(&self, owner_id: i64, year: i32) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait TimeEntryRepository: Send + Sync {
    async fn list(
        &self,
        owner_id: i64,
        project_id: Option<i64>,
    ) -> Result<Vec<TimeEntry>, RepositoryError>;

    async fn get(&self, owner_id: i64, id: i64) -> Result<TimeEntry, RepositoryError>;

    async fn insert(
        &self,
        owner_id: i64,
        input: &TimeEntryInput,
    ) -> Result<TimeEntry, RepositoryError>;

    async fn update(
        &self,
        owner_id: i64,
        id: i64,
        input: &TimeEntryInput,
    ) -> Result<TimeEntry, RepositoryError>;

    async fn delete(&self, owner_id: i64, id: i64) -> Result<(), RepositoryError>;

    /// The owner's entry with no end time, if any.
    async fn running(&self, owner_id: i64) -> Result<Option<TimeEntry>, RepositoryError>;

    async fn start(
        &self,
        owner_id: i64,
        timer: &StartTimer,
        started_at: DateTime<Utc>,
    ) -> Result<TimeEntry, RepositoryError>;

    /// Close a running entry.
    ///
    /// Returns `Err(RepositoryError::NotFound)` if the entry is missing or
    /// already stopped.
    async fn stop(
        &self,
        owner_id: i64,
        id: i64,
        ended_at: DateTime<Utc>,
    ) -> Result<TimeEntry, RepositoryError>;

    /// Sum of billable minutes for finished entries started at or after `since`.
    async fn billable_minutes_since(
        &self,
        owner_id: i64,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait CalendarRepository: Send + Sync {
    /// Events overlapping `range`, ordered by start time.
    async fn list(
        &self,
        owner_id: i64,
        range: &EventRange,
    ) -> Result<Vec<CalendarEvent>, RepositoryError>;

    async fn get(&self, owner_id: i64, id: i64) -> Result<CalendarEvent, RepositoryError>;

    async fn insert(
        &self,
        owner_id: i64,
        input: &EventInput,
    ) -> Result<CalendarEvent, RepositoryError>;

    async fn update(
        &self,
        owner_id: i64,
        id: i64,
        input: &EventInput,
    ) -> Result<CalendarEvent, RepositoryError>;

    async fn delete(&self, owner_id: i64, id: i64) -> Result<(), RepositoryError>;
}
