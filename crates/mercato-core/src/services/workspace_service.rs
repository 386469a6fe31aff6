//! Freelancer workspace: clients, projects, tasks, invoices, time tracking
//! and calendar events.
//!
//! Every operation is scoped to the calling user. References to other
//! workspace rows (a project's client, a task's project, ...) must belong to
//! the same owner; a foreign id is reported as an invalid field.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, info};

use crate::domain::{
    CalendarEvent, Client, ClientInput, EventInput, EventRange, Invoice, InvoiceInput,
    InvoiceStatus, MAX_INVOICE_ITEMS, MAX_ITEM_QUANTITY, MAX_UNIT_PRICE_CENTS, Project,
    ProjectInput, ProjectStatus, StartTimer, Task, TaskInput, TimeEntry, TimeEntryInput,
    WorkspaceSummary,
};
use crate::ports::{
    CalendarRepository, ClientRepository, CoreError, InvoiceRepository, ProjectRepository,
    RepositoryError, TaskRepository, TimeEntryRepository,
};
use crate::utils::validation::{ValidationErrors, clean_optional, is_valid_email};

/// How many numbers to try when an auto-generated invoice number is taken.
const MAX_NUMBER_ATTEMPTS: i64 = 1_000;

pub struct WorkspaceService {
    clients: Arc<dyn ClientRepository>,
    projects: Arc<dyn ProjectRepository>,
    tasks: Arc<dyn TaskRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    time_entries: Arc<dyn TimeEntryRepository>,
    events: Arc<dyn CalendarRepository>,
}

impl WorkspaceService {
    pub fn new(
        clients: Arc<dyn ClientRepository>,
        projects: Arc<dyn ProjectRepository>,
        tasks: Arc<dyn TaskRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        time_entries: Arc<dyn TimeEntryRepository>,
        events: Arc<dyn CalendarRepository>,
    ) -> Self {
        Self {
            clients,
            projects,
            tasks,
            invoices,
            time_entries,
            events,
        }
    }

    // Clients

    pub async fn list_clients(&self, owner_id: i64) -> Result<Vec<Client>, CoreError> {
        Ok(self.clients.list(owner_id).await?)
    }

    pub async fn get_client(&self, owner_id: i64, id: i64) -> Result<Client, CoreError> {
        Ok(self.clients.get(owner_id, id).await?)
    }

    pub async fn create_client(
        &self,
        owner_id: i64,
        input: ClientInput,
    ) -> Result<Client, CoreError> {
        let input = clean_client(input)?;
        let client = self.clients.insert(owner_id, &input).await?;
        debug!(owner_id, client_id = client.id, "Client created");
        Ok(client)
    }

    pub async fn update_client(
        &self,
        owner_id: i64,
        id: i64,
        input: ClientInput,
    ) -> Result<Client, CoreError> {
        let input = clean_client(input)?;
        Ok(self.clients.update(owner_id, id, &input).await?)
    }

    pub async fn delete_client(&self, owner_id: i64, id: i64) -> Result<(), CoreError> {
        Ok(self.clients.delete(owner_id, id).await?)
    }

    // Projects

    pub async fn list_projects(&self, owner_id: i64) -> Result<Vec<Project>, CoreError> {
        Ok(self.projects.list(owner_id).await?)
    }

    pub async fn get_project(&self, owner_id: i64, id: i64) -> Result<Project, CoreError> {
        Ok(self.projects.get(owner_id, id).await?)
    }

    pub async fn create_project(
        &self,
        owner_id: i64,
        input: ProjectInput,
    ) -> Result<Project, CoreError> {
        let input = self.clean_project(owner_id, input).await?;
        let project = self.projects.insert(owner_id, &input).await?;
        debug!(owner_id, project_id = project.id, "Project created");
        Ok(project)
    }

    pub async fn update_project(
        &self,
        owner_id: i64,
        id: i64,
        input: ProjectInput,
    ) -> Result<Project, CoreError> {
        let input = self.clean_project(owner_id, input).await?;
        Ok(self.projects.update(owner_id, id, &input).await?)
    }

    pub async fn delete_project(&self, owner_id: i64, id: i64) -> Result<(), CoreError> {
        Ok(self.projects.delete(owner_id, id).await?)
    }

    // Tasks

    pub async fn list_tasks(
        &self,
        owner_id: i64,
        project_id: Option<i64>,
    ) -> Result<Vec<Task>, CoreError> {
        Ok(self.tasks.list(owner_id, project_id).await?)
    }

    pub async fn get_task(&self, owner_id: i64, id: i64) -> Result<Task, CoreError> {
        Ok(self.tasks.get(owner_id, id).await?)
    }

    pub async fn create_task(&self, owner_id: i64, input: TaskInput) -> Result<Task, CoreError> {
        let input = self.clean_task(owner_id, input).await?;
        let task = self.tasks.insert(owner_id, &input).await?;
        debug!(owner_id, task_id = task.id, "Task created");
        Ok(task)
    }

    pub async fn update_task(
        &self,
        owner_id: i64,
        id: i64,
        input: TaskInput,
    ) -> Result<Task, CoreError> {
        let input = self.clean_task(owner_id, input).await?;
        Ok(self.tasks.update(owner_id, id, &input).await?)
    }

    pub async fn delete_task(&self, owner_id: i64, id: i64) -> Result<(), CoreError> {
        Ok(self.tasks.delete(owner_id, id).await?)
    }

    // Invoices

    pub async fn list_invoices(&self, owner_id: i64) -> Result<Vec<Invoice>, CoreError> {
        Ok(self.invoices.list(owner_id).await?)
    }

    pub async fn get_invoice(&self, owner_id: i64, id: i64) -> Result<Invoice, CoreError> {
        Ok(self.invoices.get(owner_id, id).await?)
    }

    /// Create an invoice. Without a number, the next free
    /// `INV-{year}-{seq:04}` for the issue year is used.
    pub async fn create_invoice(
        &self,
        owner_id: i64,
        input: InvoiceInput,
    ) -> Result<Invoice, CoreError> {
        let input = self.clean_invoice(owner_id, input).await?;

        if let Some(number) = input.number.clone() {
            let invoice = self
                .invoices
                .insert(owner_id, &number, &input)
                .await
                .map_err(number_conflict)?;
            info!(owner_id, invoice_id = invoice.id, number = %invoice.number, "Invoice created");
            return Ok(invoice);
        }

        let year = input
            .issue_date
            .unwrap_or_else(|| Utc::now().date_naive())
            .year();
        let mut seq = self.invoices.count_for_year(owner_id, year).await? + 1;
        for _ in 0..MAX_NUMBER_ATTEMPTS {
            let number = invoice_number(year, seq);
            match self.invoices.insert(owner_id, &number, &input).await {
                Ok(invoice) => {
                    info!(owner_id, invoice_id = invoice.id, number = %invoice.number, "Invoice created");
                    return Ok(invoice);
                }
                Err(RepositoryError::AlreadyExists(_)) => seq += 1,
                Err(e) => return Err(e.into()),
            }
        }
        Err(CoreError::Internal(format!(
            "could not allocate an invoice number for {year}"
        )))
    }

    /// Replace an invoice's header and items. The number is kept unless a
    /// new one is given.
    pub async fn update_invoice(
        &self,
        owner_id: i64,
        id: i64,
        input: InvoiceInput,
    ) -> Result<Invoice, CoreError> {
        let existing = self.invoices.get(owner_id, id).await?;
        let input = self.clean_invoice(owner_id, input).await?;
        let number = input.number.clone().unwrap_or(existing.number);
        self.invoices
            .update(owner_id, id, &number, &input)
            .await
            .map_err(number_conflict)
    }

    pub async fn set_invoice_status(
        &self,
        owner_id: i64,
        id: i64,
        status: InvoiceStatus,
    ) -> Result<Invoice, CoreError> {
        let invoice = self.invoices.set_status(owner_id, id, status).await?;
        info!(owner_id, invoice_id = id, status = %status, "Invoice status changed");
        Ok(invoice)
    }

    pub async fn delete_invoice(&self, owner_id: i64, id: i64) -> Result<(), CoreError> {
        Ok(self.invoices.delete(owner_id, id).await?)
    }

    // Time entries

    pub async fn list_time_entries(
        &self,
        owner_id: i64,
        project_id: Option<i64>,
    ) -> Result<Vec<TimeEntry>, CoreError> {
        Ok(self.time_entries.list(owner_id, project_id).await?)
    }

    pub async fn get_time_entry(&self, owner_id: i64, id: i64) -> Result<TimeEntry, CoreError> {
        Ok(self.time_entries.get(owner_id, id).await?)
    }

    pub async fn create_time_entry(
        &self,
        owner_id: i64,
        input: TimeEntryInput,
    ) -> Result<TimeEntry, CoreError> {
        let input = self.clean_time_entry(owner_id, input).await?;
        Ok(self.time_entries.insert(owner_id, &input).await?)
    }

    pub async fn update_time_entry(
        &self,
        owner_id: i64,
        id: i64,
        input: TimeEntryInput,
    ) -> Result<TimeEntry, CoreError> {
        let input = self.clean_time_entry(owner_id, input).await?;
        Ok(self.time_entries.update(owner_id, id, &input).await?)
    }

    pub async fn delete_time_entry(&self, owner_id: i64, id: i64) -> Result<(), CoreError> {
        Ok(self.time_entries.delete(owner_id, id).await?)
    }

    /// Start a timer. Only one timer may run per owner.
    pub async fn start_timer(
        &self,
        owner_id: i64,
        timer: StartTimer,
    ) -> Result<TimeEntry, CoreError> {
        if let Some(running) = self.time_entries.running(owner_id).await? {
            return Err(CoreError::Conflict(format!(
                "timer {} is already running",
                running.id
            )));
        }
        let mut errors = ValidationErrors::new();
        self.check_project(owner_id, timer.project_id, &mut errors).await?;
        self.check_task(owner_id, timer.task_id, &mut errors).await?;
        errors.into_result()?;

        let timer = StartTimer {
            description: clean_optional(timer.description),
            ..timer
        };
        let entry = self.time_entries.start(owner_id, &timer, Utc::now()).await?;
        info!(owner_id, entry_id = entry.id, "Timer started");
        Ok(entry)
    }

    pub async fn stop_timer(&self, owner_id: i64, id: i64) -> Result<TimeEntry, CoreError> {
        let entry = self.time_entries.get(owner_id, id).await?;
        if !entry.is_running() {
            return Err(CoreError::Conflict(format!("timer {id} is not running")));
        }
        let stopped = self.time_entries.stop(owner_id, id, Utc::now()).await?;
        info!(
            owner_id,
            entry_id = id,
            minutes = stopped.duration_minutes.unwrap_or_default(),
            "Timer stopped"
        );
        Ok(stopped)
    }

    // Calendar

    pub async fn list_events(
        &self,
        owner_id: i64,
        range: EventRange,
    ) -> Result<Vec<CalendarEvent>, CoreError> {
        if let (Some(from), Some(to)) = (range.from, range.to) {
            if to < from {
                return Err(CoreError::invalid("to", "must not be before from"));
            }
        }
        Ok(self.events.list(owner_id, &range).await?)
    }

    pub async fn get_event(&self, owner_id: i64, id: i64) -> Result<CalendarEvent, CoreError> {
        Ok(self.events.get(owner_id, id).await?)
    }

    pub async fn create_event(
        &self,
        owner_id: i64,
        input: EventInput,
    ) -> Result<CalendarEvent, CoreError> {
        let input = self.clean_event(owner_id, input).await?;
        Ok(self.events.insert(owner_id, &input).await?)
    }

    pub async fn update_event(
        &self,
        owner_id: i64,
        id: i64,
        input: EventInput,
    ) -> Result<CalendarEvent, CoreError> {
        let input = self.clean_event(owner_id, input).await?;
        Ok(self.events.update(owner_id, id, &input).await?)
    }

    pub async fn delete_event(&self, owner_id: i64, id: i64) -> Result<(), CoreError> {
        Ok(self.events.delete(owner_id, id).await?)
    }

    /// Dashboard counters for the owner.
    pub async fn summary(&self, owner_id: i64) -> Result<WorkspaceSummary, CoreError> {
        let outstanding_invoice_cents = self
            .invoices
            .list(owner_id)
            .await?
            .iter()
            .filter(|i| i.status.is_outstanding())
            .fold(0i64, |acc, i| acc.saturating_add(i.totals.total_cents));

        Ok(WorkspaceSummary {
            clients: self.clients.count(owner_id).await?,
            active_projects: self
                .projects
                .count_with_status(owner_id, ProjectStatus::Active)
                .await?,
            open_tasks: self.tasks.count_open(owner_id).await?,
            outstanding_invoice_cents,
            billable_minutes_this_month: self
                .time_entries
                .billable_minutes_since(owner_id, month_start(Utc::now()))
                .await?,
            running_timer: self.time_entries.running(owner_id).await?,
        })
    }

    // Input cleaning and reference checks

    async fn clean_project(
        &self,
        owner_id: i64,
        input: ProjectInput,
    ) -> Result<ProjectInput, CoreError> {
        let input = ProjectInput {
            name: input.name.trim().to_string(),
            description: clean_optional(input.description),
            ..input
        };
        let mut errors = ValidationErrors::new();
        errors.check(input.name.is_empty(), "name", "is required");
        errors.check(
            input.budget_cents.is_some_and(|v| v < 0),
            "budget_cents",
            "must not be negative",
        );
        errors.check(
            input.hourly_rate_cents.is_some_and(|v| v < 0),
            "hourly_rate_cents",
            "must not be negative",
        );
        self.check_client(owner_id, input.client_id, &mut errors).await?;
        errors.into_result()?;
        Ok(input)
    }

    async fn clean_task(&self, owner_id: i64, input: TaskInput) -> Result<TaskInput, CoreError> {
        let input = TaskInput {
            title: input.title.trim().to_string(),
            description: clean_optional(input.description),
            ..input
        };
        let mut errors = ValidationErrors::new();
        errors.check(input.title.is_empty(), "title", "is required");
        self.check_project(owner_id, input.project_id, &mut errors).await?;
        errors.into_result()?;
        Ok(input)
    }

    async fn clean_invoice(
        &self,
        owner_id: i64,
        input: InvoiceInput,
    ) -> Result<InvoiceInput, CoreError> {
        let mut input = InvoiceInput {
            number: clean_optional(input.number),
            notes: clean_optional(input.notes),
            issue_date: Some(input.issue_date.unwrap_or_else(|| Utc::now().date_naive())),
            status: Some(input.status.unwrap_or(InvoiceStatus::Draft)),
            ..input
        };
        for item in &mut input.items {
            item.description = item.description.trim().to_string();
        }

        let mut errors = ValidationErrors::new();
        errors.check(
            !(0..=10_000).contains(&input.tax_rate_bps),
            "tax_rate_bps",
            "must be between 0 and 10000",
        );
        errors.check(input.items.is_empty(), "items", "at least one item is required");
        errors.check(
            input.items.len() > MAX_INVOICE_ITEMS,
            "items",
            "too many items",
        );
        for item in &input.items {
            errors.check(item.description.is_empty(), "items", "every item needs a description");
            errors.check(
                !(item.quantity.is_finite()
                    && item.quantity > 0.0
                    && item.quantity <= MAX_ITEM_QUANTITY),
                "items",
                "quantities must be positive and at most 1000000",
            );
            errors.check(
                !(0..=MAX_UNIT_PRICE_CENTS).contains(&item.unit_price_cents),
                "items",
                "unit prices must be between 0 and 10000000000",
            );
        }
        if let (Some(issue), Some(due)) = (input.issue_date, input.due_date) {
            errors.check(due < issue, "due_date", "must not be before issue_date");
        }
        if found(self.clients.get(owner_id, input.client_id).await)?.is_none() {
            errors.add("client_id", "unknown client");
        }
        self.check_project(owner_id, input.project_id, &mut errors).await?;
        errors.into_result()?;
        Ok(input)
    }

    async fn clean_time_entry(
        &self,
        owner_id: i64,
        input: TimeEntryInput,
    ) -> Result<TimeEntryInput, CoreError> {
        let input = TimeEntryInput {
            description: clean_optional(input.description),
            ..input
        };
        let mut errors = ValidationErrors::new();
        errors.check(
            input.ended_at.is_some_and(|end| end < input.started_at),
            "ended_at",
            "must not be before started_at",
        );
        errors.check(
            input.hourly_rate_cents.is_some_and(|v| v < 0),
            "hourly_rate_cents",
            "must not be negative",
        );
        self.check_project(owner_id, input.project_id, &mut errors).await?;
        self.check_task(owner_id, input.task_id, &mut errors).await?;
        errors.into_result()?;
        Ok(input)
    }

    async fn clean_event(&self, owner_id: i64, input: EventInput) -> Result<EventInput, CoreError> {
        let input = EventInput {
            title: input.title.trim().to_string(),
            description: clean_optional(input.description),
            location: clean_optional(input.location),
            ..input
        };
        let mut errors = ValidationErrors::new();
        errors.check(input.title.is_empty(), "title", "is required");
        errors.check(
            input.ends_at <= input.starts_at,
            "ends_at",
            "must be after starts_at",
        );
        self.check_project(owner_id, input.project_id, &mut errors).await?;
        errors.into_result()?;
        Ok(input)
    }

    async fn check_client(
        &self,
        owner_id: i64,
        id: Option<i64>,
        errors: &mut ValidationErrors,
    ) -> Result<(), CoreError> {
        if let Some(id) = id {
            if found(self.clients.get(owner_id, id).await)?.is_none() {
                errors.add("client_id", "unknown client");
            }
        }
        Ok(())
    }

    async fn check_project(
        &self,
        owner_id: i64,
        id: Option<i64>,
        errors: &mut ValidationErrors,
    ) -> Result<(), CoreError> {
        if let Some(id) = id {
            if found(self.projects.get(owner_id, id).await)?.is_none() {
                errors.add("project_id", "unknown project");
            }
        }
        Ok(())
    }

    async fn check_task(
        &self,
        owner_id: i64,
        id: Option<i64>,
        errors: &mut ValidationErrors,
    ) -> Result<(), CoreError> {
        if let Some(id) = id {
            if found(self.tasks.get(owner_id, id).await)?.is_none() {
                errors.add("task_id", "unknown task");
            }
        }
        Ok(())
    }
}

fn clean_client(input: ClientInput) -> Result<ClientInput, CoreError> {
    let input = ClientInput {
        name: input.name.trim().to_string(),
        email: clean_optional(input.email),
        company: clean_optional(input.company),
        phone: clean_optional(input.phone),
        notes: clean_optional(input.notes),
    };
    let mut errors = ValidationErrors::new();
    errors.check(input.name.is_empty(), "name", "is required");
    errors.check(
        input.email.as_deref().is_some_and(|e| !is_valid_email(e)),
        "email",
        "must be a valid email address",
    );
    errors.into_result()?;
    Ok(input)
}

/// Turn a scoped lookup into `Some`/`None`, keeping real storage errors.
fn found<T>(result: Result<T, RepositoryError>) -> Result<Option<T>, CoreError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(RepositoryError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn number_conflict(e: RepositoryError) -> CoreError {
    match e {
        RepositoryError::AlreadyExists(_) => {
            CoreError::Conflict("invoice number is already in use".to_string())
        }
        other => other.into(),
    }
}

/// `INV-{year}-{seq:04}`
pub fn invoice_number(year: i32, seq: i64) -> String {
    format!("INV-{year}-{seq:04}")
}

fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .with_day(1)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map_or(now, |midnight| midnight.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_invoice_number_format() {
        assert_eq!(invoice_number(2025, 7), "INV-2025-0007");
        assert_eq!(invoice_number(2025, 12_345), "INV-2025-12345");
    }

    #[test]
    fn test_month_start() {
        let now = Utc.with_ymd_and_hms(2025, 3, 18, 14, 5, 9).unwrap();
        assert_eq!(
            month_start(now),
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_client_requires_name_and_valid_email() {
        let err = clean_client(ClientInput {
            name: "  ".into(),
            email: Some("nope".into()),
            ..Default::default()
        })
        .unwrap_err();
        let CoreError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.get("name").is_some());
        assert!(errors.get("email").is_some());
    }

    #[test]
    fn test_found_maps_not_found_to_none() {
        assert!(matches!(
            found::<i64>(Err(RepositoryError::NotFound("x".into()))),
            Ok(None)
        ));
        assert!(found::<i64>(Err(RepositoryError::Storage("x".into()))).is_err());
        assert!(matches!(found(Ok(3)), Ok(Some(3))));
    }
}
