//! Freelancer workspace: clients, projects, tasks, invoices, time entries
//! and calendar events.
//!
//! Every workspace row belongs to exactly one owner (`owner_id`), and all
//! reads and writes are scoped by it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

string_enum! {
    pub enum ProjectStatus {
        Active => "ACTIVE",
        OnHold => "ON_HOLD",
        Completed => "COMPLETED",
        Archived => "ARCHIVED",
    }
}

string_enum! {
    pub enum TaskStatus {
        Todo => "TODO",
        InProgress => "IN_PROGRESS",
        Done => "DONE",
    }
}

string_enum! {
    pub enum TaskPriority {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
    }
}

string_enum! {
    pub enum InvoiceStatus {
        Draft => "DRAFT",
        Sent => "SENT",
        Paid => "PAID",
        Overdue => "OVERDUE",
        Cancelled => "CANCELLED",
    }
}

impl InvoiceStatus {
    /// Whether the invoice still counts toward money owed.
    #[must_use]
    pub const fn is_outstanding(self) -> bool {
        matches!(self, Self::Sent | Self::Overdue)
    }
}

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientInput {
    pub name: String,
    pub email: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub owner_id: i64,
    pub client_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub budget_cents: Option<i64>,
    pub hourly_rate_cents: Option<i64>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectInput {
    pub client_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    /// Defaults to `ACTIVE` when omitted.
    pub status: Option<ProjectStatus>,
    pub budget_cents: Option<i64>,
    pub hourly_rate_cents: Option<i64>,
    pub due_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub owner_id: i64,
    pub project_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskInput {
    pub project_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Invoices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: i64,
    pub description: String,
    pub quantity: f64,
    pub unit_price_cents: i64,
    pub amount_cents: i64,
}

/// Largest accepted unit price, in minor units.
pub const MAX_UNIT_PRICE_CENTS: i64 = 10_000_000_000;
/// Largest accepted quantity on one invoice line.
pub const MAX_ITEM_QUANTITY: f64 = 1_000_000.0;
/// Most lines one invoice may carry.
pub const MAX_INVOICE_ITEMS: usize = 200;

/// Line amount in minor units, rounded to the nearest cent.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn line_amount(quantity: f64, unit_price_cents: i64) -> i64 {
    (quantity * unit_price_cents as f64).round() as i64
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

impl InvoiceTotals {
    /// Sum line amounts and apply tax, rounding half up.
    ///
    /// Sums saturate at `i64::MAX` instead of wrapping.
    #[must_use]
    pub fn compute(items: &[InvoiceItem], tax_rate_bps: i64) -> Self {
        let subtotal_cents = items
            .iter()
            .fold(0i64, |acc, i| acc.saturating_add(i.amount_cents));
        let tax = (i128::from(subtotal_cents) * i128::from(tax_rate_bps) + 5_000) / 10_000;
        let tax_cents = i64::try_from(tax).unwrap_or(if tax < 0 { i64::MIN } else { i64::MAX });
        Self {
            subtotal_cents,
            tax_cents,
            total_cents: subtotal_cents.saturating_add(tax_cents),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub owner_id: i64,
    pub client_id: i64,
    pub project_id: Option<i64>,
    pub number: String,
    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub tax_rate_bps: i64,
    pub notes: Option<String>,
    pub items: Vec<InvoiceItem>,
    #[serde(flatten)]
    pub totals: InvoiceTotals,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceItemInput {
    pub description: String,
    pub quantity: f64,
    pub unit_price_cents: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceInput {
    pub client_id: i64,
    pub project_id: Option<i64>,
    /// Generated as `INV-{year}-{seq}` when omitted.
    pub number: Option<String>,
    pub status: Option<InvoiceStatus>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub tax_rate_bps: i64,
    pub notes: Option<String>,
    pub items: Vec<InvoiceItemInput>,
}

/// Status change body for an invoice.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InvoiceStatusUpdate {
    pub status: InvoiceStatus,
}

// ---------------------------------------------------------------------------
// Time tracking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: i64,
    pub owner_id: i64,
    pub project_id: Option<i64>,
    pub task_id: Option<i64>,
    pub description: Option<String>,
    pub started_at: DateTime<Utc>,
    /// `None` while the timer is running.
    pub ended_at: Option<DateTime<Utc>>,
    pub billable: bool,
    pub hourly_rate_cents: Option<i64>,
    pub duration_minutes: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl TimeEntry {
    /// Whole minutes between start and end, if the entry is closed.
    #[must_use]
    pub fn minutes_between(started_at: DateTime<Utc>, ended_at: Option<DateTime<Utc>>) -> Option<i64> {
        ended_at.map(|end| (end - started_at).num_minutes().max(0))
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.ended_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEntryInput {
    pub project_id: Option<i64>,
    pub task_id: Option<i64>,
    pub description: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default = "default_billable")]
    pub billable: bool,
    pub hourly_rate_cents: Option<i64>,
}

/// Start-timer body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartTimer {
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub task_id: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_billable")]
    pub billable: bool,
}

impl Default for StartTimer {
    fn default() -> Self {
        Self {
            project_id: None,
            task_id: None,
            description: None,
            billable: true,
        }
    }
}

const fn default_billable() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: i64,
    pub owner_id: i64,
    pub project_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInput {
    #[serde(default)]
    pub project_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Optional window for listing events. Events overlapping it are returned.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct EventRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Dashboard numbers for the workspace home.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceSummary {
    pub clients: i64,
    pub active_projects: i64,
    pub open_tasks: i64,
    pub outstanding_invoice_cents: i64,
    pub billable_minutes_this_month: i64,
    pub running_timer: Option<TimeEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item(amount_cents: i64) -> InvoiceItem {
        InvoiceItem {
            id: 0,
            invoice_id: 0,
            description: "work".into(),
            quantity: 1.0,
            unit_price_cents: amount_cents,
            amount_cents,
        }
    }

    #[test]
    fn test_line_amount_rounds_to_cent() {
        assert_eq!(line_amount(1.5, 10_000), 15_000);
        assert_eq!(line_amount(0.333, 100), 33);
        assert_eq!(line_amount(2.0, 0), 0);
    }

    #[test]
    fn test_invoice_totals_with_tax() {
        let totals = InvoiceTotals::compute(&[item(10_000), item(5_050)], 2_000);
        assert_eq!(totals.subtotal_cents, 15_050);
        assert_eq!(totals.tax_cents, 3_010);
        assert_eq!(totals.total_cents, 18_060);
    }

    #[test]
    fn test_invoice_totals_saturate_instead_of_wrapping() {
        let totals = InvoiceTotals::compute(&[item(5 * 10i64.pow(18)), item(5 * 10i64.pow(18))], 2_000);
        assert_eq!(totals.subtotal_cents, i64::MAX);
        assert_eq!(totals.total_cents, i64::MAX);
        assert!(totals.tax_cents > 0);
    }

    #[test]
    fn test_largest_accepted_invoice_fits() {
        let line = line_amount(MAX_ITEM_QUANTITY, MAX_UNIT_PRICE_CENTS);
        let items: Vec<InvoiceItem> = (0..MAX_INVOICE_ITEMS).map(|_| item(line)).collect();
        let totals = InvoiceTotals::compute(&items, 10_000);
        assert!(totals.total_cents < i64::MAX);
        assert_eq!(totals.total_cents, totals.subtotal_cents * 2);
    }

    #[test]
    fn test_invoice_totals_empty() {
        assert_eq!(InvoiceTotals::compute(&[], 2_000), InvoiceTotals::default());
    }

    #[test]
    fn test_time_entry_minutes() {
        let start = Utc::now();
        assert_eq!(
            TimeEntry::minutes_between(start, Some(start + Duration::minutes(95))),
            Some(95)
        );
        assert_eq!(TimeEntry::minutes_between(start, None), None);
        assert_eq!(
            TimeEntry::minutes_between(start, Some(start - Duration::minutes(5))),
            Some(0)
        );
    }

    #[test]
    fn test_outstanding_invoice_states() {
        assert!(InvoiceStatus::Sent.is_outstanding());
        assert!(InvoiceStatus::Overdue.is_outstanding());
        assert!(!InvoiceStatus::Draft.is_outstanding());
        assert!(!InvoiceStatus::Paid.is_outstanding());
    }

    #[test]
    fn test_start_timer_defaults_to_billable() {
        let timer: StartTimer = serde_json::from_str("{}").unwrap();
        assert!(timer.billable);
    }
}
