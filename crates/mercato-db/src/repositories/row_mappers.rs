//! Row mapping helpers for `SQLite` queries.
//!
//! Timestamps are stored as RFC 3339 text with a fixed microsecond width
//! and a `Z` suffix, so lexical comparison in SQL matches time order.
//! Calendar dates are stored as `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use mercato_core::{
    AgentConversation, AgentMessage, Business, CalendarEvent, Client, InvoiceItem, Media,
    MessageRole, MissionMessage, MissionRequest, MissionStatus, Payment, PaymentStatus, Project,
    ProjectStatus, RepositoryError, Review, Service, SubscriptionStatus, SubscriptionTier, Task,
    TaskPriority, TaskStatus, TimeEntry, User, UserRole, VerificationStatus,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Decode, Row, Sqlite, Type};

/// Shared SELECT column lists.
pub const USER_SELECT_COLUMNS: &str = "id, email, password_hash, name, role, subscription_status, subscription_plan, payments_customer_id, payout_account_id, payouts_enabled, created_at, updated_at";
pub const BUSINESS_SELECT_COLUMNS: &str = "id, owner_id, name, slug, description, category, city, phone, website, subscription_tier, verification_status, is_ai_agent, ai_prompt, ai_price_cents, rating_avg, review_count, created_at, updated_at";
pub const SERVICE_SELECT_COLUMNS: &str =
    "id, business_id, name, description, price_cents, duration_minutes, created_at";
pub const REVIEW_SELECT_COLUMNS: &str =
    "id, business_id, author_id, rating, comment, created_at";
pub const MEDIA_SELECT_COLUMNS: &str = "id, owner_id, business_id, provider, storage_key, url, content_type, size_bytes, created_at";
pub const MISSION_SELECT_COLUMNS: &str = "id, business_id, client_id, client_email, client_name, title, description, budget_cents, status, deadline, created_at, updated_at";
pub const MISSION_MESSAGE_SELECT_COLUMNS: &str = "id, mission_id, sender_id, body, created_at";
pub const PAYMENT_SELECT_COLUMNS: &str = "id, mission_id, amount_cents, platform_fee_cents, currency, status, checkout_session_id, transfer_id, created_at, released_at";
pub const CONVERSATION_SELECT_COLUMNS: &str =
    "id, business_id, visitor_id, created_at, updated_at";
pub const AGENT_MESSAGE_SELECT_COLUMNS: &str =
    "id, conversation_id, role, content, created_at";
pub const CLIENT_SELECT_COLUMNS: &str =
    "id, owner_id, name, email, company, phone, notes, created_at, updated_at";
pub const PROJECT_SELECT_COLUMNS: &str = "id, owner_id, client_id, name, description, status, budget_cents, hourly_rate_cents, due_date, created_at, updated_at";
pub const TASK_SELECT_COLUMNS: &str = "id, owner_id, project_id, title, description, status, priority, due_date, created_at, updated_at";
pub const INVOICE_SELECT_COLUMNS: &str = "id, owner_id, client_id, project_id, number, status, issue_date, due_date, tax_rate_bps, notes, created_at, updated_at";
pub const INVOICE_ITEM_SELECT_COLUMNS: &str =
    "id, invoice_id, description, quantity, unit_price_cents, amount_cents";
pub const TIME_ENTRY_SELECT_COLUMNS: &str = "id, owner_id, project_id, task_id, description, started_at, ended_at, billable, hourly_rate_cents, created_at";
pub const EVENT_SELECT_COLUMNS: &str =
    "id, owner_id, project_id, title, description, location, starts_at, ends_at, created_at";

/// Map any sqlx failure to a storage error.
pub fn storage(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

/// Map a failed INSERT/UPDATE, surfacing constraint violations.
pub fn write_error(e: sqlx::Error, what: &str) -> RepositoryError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return RepositoryError::AlreadyExists(what.to_string());
        }
        if db.is_foreign_key_violation() || db.is_check_violation() {
            return RepositoryError::Constraint(format!("{what}: {}", db.message()));
        }
    }
    storage(e)
}

/// Storage form of a timestamp.
pub fn ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Storage form of the current time.
pub fn now() -> String {
    ts(Utc::now())
}

/// Storage form of a calendar date.
pub fn date(value: NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub fn col<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: Decode<'r, Sqlite> + Type<Sqlite>,
{
    row.try_get(name).map_err(storage)
}

fn parse_ts(name: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Serialization(format!("{name}: {e}")))
}

fn parse_date(name: &str, raw: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Serialization(format!("{name}: {e}")))
}

pub fn ts_col(row: &SqliteRow, name: &str) -> Result<DateTime<Utc>, RepositoryError> {
    parse_ts(name, &col::<String>(row, name)?)
}

pub fn opt_ts_col(row: &SqliteRow, name: &str) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    col::<Option<String>>(row, name)?
        .map(|raw| parse_ts(name, &raw))
        .transpose()
}

pub fn date_col(row: &SqliteRow, name: &str) -> Result<NaiveDate, RepositoryError> {
    parse_date(name, &col::<String>(row, name)?)
}

pub fn opt_date_col(row: &SqliteRow, name: &str) -> Result<Option<NaiveDate>, RepositoryError> {
    col::<Option<String>>(row, name)?
        .map(|raw| parse_date(name, &raw))
        .transpose()
}

/// Decode a text column through one of the domain `parse` functions.
pub fn enum_col<T>(
    row: &SqliteRow,
    name: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<T, RepositoryError> {
    let raw: String = col(row, name)?;
    parse(&raw).ok_or_else(|| RepositoryError::Serialization(format!("{name}: unknown value '{raw}'")))
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn row_to_user(row: &SqliteRow) -> Result<User, RepositoryError> {
    let plan: Option<String> = col(row, "subscription_plan")?;
    Ok(User {
        id: col(row, "id")?,
        email: col(row, "email")?,
        password_hash: col(row, "password_hash")?,
        name: col(row, "name")?,
        role: enum_col(row, "role", UserRole::parse)?,
        subscription_status: enum_col(row, "subscription_status", SubscriptionStatus::parse)?,
        subscription_plan: plan.as_deref().and_then(SubscriptionTier::parse),
        payments_customer_id: col(row, "payments_customer_id")?,
        payout_account_id: col(row, "payout_account_id")?,
        payouts_enabled: col(row, "payouts_enabled")?,
        created_at: ts_col(row, "created_at")?,
        updated_at: ts_col(row, "updated_at")?,
    })
}

pub fn row_to_business(row: &SqliteRow) -> Result<Business, RepositoryError> {
    Ok(Business {
        id: col(row, "id")?,
        owner_id: col(row, "owner_id")?,
        name: col(row, "name")?,
        slug: col(row, "slug")?,
        description: col(row, "description")?,
        category: col(row, "category")?,
        city: col(row, "city")?,
        phone: col(row, "phone")?,
        website: col(row, "website")?,
        subscription_tier: enum_col(row, "subscription_tier", SubscriptionTier::parse)?,
        verification_status: enum_col(row, "verification_status", VerificationStatus::parse)?,
        is_ai_agent: col(row, "is_ai_agent")?,
        ai_prompt: col(row, "ai_prompt")?,
        ai_price_cents: col(row, "ai_price_cents")?,
        rating_avg: col(row, "rating_avg")?,
        review_count: col(row, "review_count")?,
        created_at: ts_col(row, "created_at")?,
        updated_at: ts_col(row, "updated_at")?,
    })
}

pub fn row_to_service(row: &SqliteRow) -> Result<Service, RepositoryError> {
    Ok(Service {
        id: col(row, "id")?,
        business_id: col(row, "business_id")?,
        name: col(row, "name")?,
        description: col(row, "description")?,
        price_cents: col(row, "price_cents")?,
        duration_minutes: col(row, "duration_minutes")?,
        created_at: ts_col(row, "created_at")?,
    })
}

pub fn row_to_review(row: &SqliteRow) -> Result<Review, RepositoryError> {
    Ok(Review {
        id: col(row, "id")?,
        business_id: col(row, "business_id")?,
        author_id: col(row, "author_id")?,
        rating: col(row, "rating")?,
        comment: col(row, "comment")?,
        created_at: ts_col(row, "created_at")?,
    })
}

pub fn row_to_media(row: &SqliteRow) -> Result<Media, RepositoryError> {
    Ok(Media {
        id: col(row, "id")?,
        owner_id: col(row, "owner_id")?,
        business_id: col(row, "business_id")?,
        provider: col(row, "provider")?,
        storage_key: col(row, "storage_key")?,
        url: col(row, "url")?,
        content_type: col(row, "content_type")?,
        size_bytes: col(row, "size_bytes")?,
        created_at: ts_col(row, "created_at")?,
    })
}

pub fn row_to_mission(row: &SqliteRow) -> Result<MissionRequest, RepositoryError> {
    Ok(MissionRequest {
        id: col(row, "id")?,
        business_id: col(row, "business_id")?,
        client_id: col(row, "client_id")?,
        client_email: col(row, "client_email")?,
        client_name: col(row, "client_name")?,
        title: col(row, "title")?,
        description: col(row, "description")?,
        budget_cents: col(row, "budget_cents")?,
        status: enum_col(row, "status", MissionStatus::parse)?,
        deadline: opt_ts_col(row, "deadline")?,
        created_at: ts_col(row, "created_at")?,
        updated_at: ts_col(row, "updated_at")?,
    })
}

pub fn row_to_mission_message(row: &SqliteRow) -> Result<MissionMessage, RepositoryError> {
    Ok(MissionMessage {
        id: col(row, "id")?,
        mission_id: col(row, "mission_id")?,
        sender_id: col(row, "sender_id")?,
        body: col(row, "body")?,
        created_at: ts_col(row, "created_at")?,
    })
}

pub fn row_to_payment(row: &SqliteRow) -> Result<Payment, RepositoryError> {
    Ok(Payment {
        id: col(row, "id")?,
        mission_id: col(row, "mission_id")?,
        amount_cents: col(row, "amount_cents")?,
        platform_fee_cents: col(row, "platform_fee_cents")?,
        currency: col(row, "currency")?,
        status: enum_col(row, "status", PaymentStatus::parse)?,
        checkout_session_id: col(row, "checkout_session_id")?,
        transfer_id: col(row, "transfer_id")?,
        created_at: ts_col(row, "created_at")?,
        released_at: opt_ts_col(row, "released_at")?,
    })
}

pub fn row_to_conversation(row: &SqliteRow) -> Result<AgentConversation, RepositoryError> {
    Ok(AgentConversation {
        id: col(row, "id")?,
        business_id: col(row, "business_id")?,
        visitor_id: col(row, "visitor_id")?,
        created_at: ts_col(row, "created_at")?,
        updated_at: ts_col(row, "updated_at")?,
    })
}

pub fn row_to_agent_message(row: &SqliteRow) -> Result<AgentMessage, RepositoryError> {
    Ok(AgentMessage {
        id: col(row, "id")?,
        conversation_id: col(row, "conversation_id")?,
        role: enum_col(row, "role", MessageRole::parse)?,
        content: col(row, "content")?,
        created_at: ts_col(row, "created_at")?,
    })
}

pub fn row_to_client(row: &SqliteRow) -> Result<Client, RepositoryError> {
    Ok(Client {
        id: col(row, "id")?,
        owner_id: col(row, "owner_id")?,
        name: col(row, "name")?,
        email: col(row, "email")?,
        company: col(row, "company")?,
        phone: col(row, "phone")?,
        notes: col(row, "notes")?,
        created_at: ts_col(row, "created_at")?,
        updated_at: ts_col(row, "updated_at")?,
    })
}

pub fn row_to_project(row: &SqliteRow) -> Result<Project, RepositoryError> {
    Ok(Project {
        id: col(row, "id")?,
        owner_id: col(row, "owner_id")?,
        client_id: col(row, "client_id")?,
        name: col(row, "name")?,
        description: col(row, "description")?,
        status: enum_col(row, "status", ProjectStatus::parse)?,
        budget_cents: col(row, "budget_cents")?,
        hourly_rate_cents: col(row, "hourly_rate_cents")?,
        due_date: opt_date_col(row, "due_date")?,
        created_at: ts_col(row, "created_at")?,
        updated_at: ts_col(row, "updated_at")?,
    })
}

pub fn row_to_task(row: &SqliteRow) -> Result<Task, RepositoryError> {
    Ok(Task {
        id: col(row, "id")?,
        owner_id: col(row, "owner_id")?,
        project_id: col(row, "project_id")?,
        title: col(row, "title")?,
        description: col(row, "description")?,
        status: enum_col(row, "status", TaskStatus::parse)?,
        priority: enum_col(row, "priority", TaskPriority::parse)?,
        due_date: opt_date_col(row, "due_date")?,
        created_at: ts_col(row, "created_at")?,
        updated_at: ts_col(row, "updated_at")?,
    })
}

pub fn row_to_invoice_item(row: &SqliteRow) -> Result<InvoiceItem, RepositoryError> {
    Ok(InvoiceItem {
        id: col(row, "id")?,
        invoice_id: col(row, "invoice_id")?,
        description: col(row, "description")?,
        quantity: col(row, "quantity")?,
        unit_price_cents: col(row, "unit_price_cents")?,
        amount_cents: col(row, "amount_cents")?,
    })
}

pub fn row_to_time_entry(row: &SqliteRow) -> Result<TimeEntry, RepositoryError> {
    let started_at = ts_col(row, "started_at")?;
    let ended_at = opt_ts_col(row, "ended_at")?;
    Ok(TimeEntry {
        id: col(row, "id")?,
        owner_id: col(row, "owner_id")?,
        project_id: col(row, "project_id")?,
        task_id: col(row, "task_id")?,
        description: col(row, "description")?,
        started_at,
        ended_at,
        billable: col(row, "billable")?,
        hourly_rate_cents: col(row, "hourly_rate_cents")?,
        duration_minutes: TimeEntry::minutes_between(started_at, ended_at),
        created_at: ts_col(row, "created_at")?,
    })
}

pub fn row_to_event(row: &SqliteRow) -> Result<CalendarEvent, RepositoryError> {
    Ok(CalendarEvent {
        id: col(row, "id")?,
        owner_id: col(row, "owner_id")?,
        project_id: col(row, "project_id")?,
        title: col(row, "title")?,
        description: col(row, "description")?,
        location: col(row, "location")?,
        starts_at: ts_col(row, "starts_at")?,
        ends_at: ts_col(row, "ends_at")?,
        created_at: ts_col(row, "created_at")?,
    })
}
