//! Workspace handlers - the freelancer's private CRM.
//!
//! Every route is scoped to the caller; rows owned by someone else answer
//! 404 exactly like missing rows.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use mercato_core::{
    CalendarEvent, Client, ClientInput, EventInput, EventRange, Invoice, InvoiceInput,
    InvoiceStatusUpdate, Project, ProjectInput, StartTimer, Task, TaskInput, TimeEntry,
    TimeEntryInput, WorkspaceSummary,
};

use crate::auth::CurrentUser;
use crate::dto::ProjectFilter;
use crate::error::HttpError;
use crate::extract::Json;
use crate::state::AppState;

type Created<T> = Result<(StatusCode, Json<T>), HttpError>;

fn created<T>(value: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(value))
}

// ============================================================================
// Clients
// ============================================================================

pub async fn list_clients(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Client>>, HttpError> {
    Ok(Json(state.core.workspace().list_clients(user.id).await?))
}

pub async fn get_client(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Client>, HttpError> {
    Ok(Json(state.core.workspace().get_client(user.id, id).await?))
}

pub async fn create_client(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ClientInput>,
) -> Created<Client> {
    Ok(created(
        state.core.workspace().create_client(user.id, input).await?,
    ))
}

pub async fn update_client(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<ClientInput>,
) -> Result<Json<Client>, HttpError> {
    Ok(Json(
        state.core.workspace().update_client(user.id, id, input).await?,
    ))
}

/// Clients referenced by invoices cannot be deleted (409).
pub async fn delete_client(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    state.core.workspace().delete_client(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Projects
// ============================================================================

pub async fn list_projects(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Project>>, HttpError> {
    Ok(Json(state.core.workspace().list_projects(user.id).await?))
}

pub async fn get_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Project>, HttpError> {
    Ok(Json(state.core.workspace().get_project(user.id, id).await?))
}

pub async fn create_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ProjectInput>,
) -> Created<Project> {
    Ok(created(
        state.core.workspace().create_project(user.id, input).await?,
    ))
}

pub async fn update_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<ProjectInput>,
) -> Result<Json<Project>, HttpError> {
    Ok(Json(
        state.core.workspace().update_project(user.id, id, input).await?,
    ))
}

pub async fn delete_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    state.core.workspace().delete_project(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Tasks
// ============================================================================

pub async fn list_tasks(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<ProjectFilter>,
) -> Result<Json<Vec<Task>>, HttpError> {
    Ok(Json(
        state
            .core
            .workspace()
            .list_tasks(user.id, filter.project_id)
            .await?,
    ))
}

pub async fn get_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Task>, HttpError> {
    Ok(Json(state.core.workspace().get_task(user.id, id).await?))
}

pub async fn create_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<TaskInput>,
) -> Created<Task> {
    Ok(created(state.core.workspace().create_task(user.id, input).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<TaskInput>,
) -> Result<Json<Task>, HttpError> {
    Ok(Json(
        state.core.workspace().update_task(user.id, id, input).await?,
    ))
}

pub async fn delete_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    state.core.workspace().delete_task(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Invoices
// ============================================================================

pub async fn list_invoices(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Invoice>>, HttpError> {
    Ok(Json(state.core.workspace().list_invoices(user.id).await?))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Invoice>, HttpError> {
    Ok(Json(state.core.workspace().get_invoice(user.id, id).await?))
}

/// Create an invoice; the number is generated when omitted.
pub async fn create_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<InvoiceInput>,
) -> Created<Invoice> {
    Ok(created(
        state.core.workspace().create_invoice(user.id, input).await?,
    ))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<InvoiceInput>,
) -> Result<Json<Invoice>, HttpError> {
    Ok(Json(
        state.core.workspace().update_invoice(user.id, id, input).await?,
    ))
}

pub async fn set_invoice_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(update): Json<InvoiceStatusUpdate>,
) -> Result<Json<Invoice>, HttpError> {
    Ok(Json(
        state
            .core
            .workspace()
            .set_invoice_status(user.id, id, update.status)
            .await?,
    ))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    state.core.workspace().delete_invoice(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Time entries
// ============================================================================

pub async fn list_time_entries(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<ProjectFilter>,
) -> Result<Json<Vec<TimeEntry>>, HttpError> {
    Ok(Json(
        state
            .core
            .workspace()
            .list_time_entries(user.id, filter.project_id)
            .await?,
    ))
}

pub async fn get_time_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<TimeEntry>, HttpError> {
    Ok(Json(state.core.workspace().get_time_entry(user.id, id).await?))
}

pub async fn create_time_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<TimeEntryInput>,
) -> Created<TimeEntry> {
    Ok(created(
        state.core.workspace().create_time_entry(user.id, input).await?,
    ))
}

pub async fn update_time_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<TimeEntryInput>,
) -> Result<Json<TimeEntry>, HttpError> {
    Ok(Json(
        state
            .core
            .workspace()
            .update_time_entry(user.id, id, input)
            .await?,
    ))
}

pub async fn delete_time_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    state.core.workspace().delete_time_entry(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Start a timer; 409 while another one is running.
pub async fn start_timer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Option<Json<StartTimer>>,
) -> Created<TimeEntry> {
    let timer = body.map(|Json(t)| t).unwrap_or_default();
    Ok(created(
        state.core.workspace().start_timer(user.id, timer).await?,
    ))
}

pub async fn stop_timer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<TimeEntry>, HttpError> {
    Ok(Json(state.core.workspace().stop_timer(user.id, id).await?))
}

// ============================================================================
// Calendar
// ============================================================================

/// Events overlapping the optional `from`/`to` window.
pub async fn list_events(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(range): Query<EventRange>,
) -> Result<Json<Vec<CalendarEvent>>, HttpError> {
    Ok(Json(state.core.workspace().list_events(user.id, range).await?))
}

pub async fn get_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<CalendarEvent>, HttpError> {
    Ok(Json(state.core.workspace().get_event(user.id, id).await?))
}

pub async fn create_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<EventInput>,
) -> Created<CalendarEvent> {
    Ok(created(
        state.core.workspace().create_event(user.id, input).await?,
    ))
}

pub async fn update_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<EventInput>,
) -> Result<Json<CalendarEvent>, HttpError> {
    Ok(Json(
        state.core.workspace().update_event(user.id, id, input).await?,
    ))
}

pub async fn delete_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    state.core.workspace().delete_event(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Summary
// ============================================================================

pub async fn summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<WorkspaceSummary>, HttpError> {
    Ok(Json(state.core.workspace().summary(user.id).await?))
}
