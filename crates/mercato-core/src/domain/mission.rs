//! Mission requests, their message threads and escrow payments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

string_enum! {
    /// Lifecycle of a mission.
    ///
    /// `PENDING -> IN_PROGRESS -> DELIVERED -> COMPLETED`, with `CANCELLED`
    /// reachable only from `PENDING`. A checkout confirmed after a cancel
    /// moves the mission to `IN_PROGRESS`.
    pub enum MissionStatus {
        Pending => "PENDING",
        InProgress => "IN_PROGRESS",
        Delivered => "DELIVERED",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
    }
}

impl MissionStatus {
    /// Whether the held funds for a mission in this state may be released.
    #[must_use]
    pub const fn allows_release(self) -> bool {
        matches!(self, Self::Delivered | Self::InProgress)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

string_enum! {
    pub enum PaymentStatus {
        /// Captured by the provider, not yet paid out.
        Held => "HELD",
        Released => "RELEASED",
    }
}

/// A client's job request directed at a freelancer listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionRequest {
    pub id: i64,
    pub business_id: i64,
    pub client_id: i64,
    pub client_email: String,
    pub client_name: Option<String>,
    pub title: String,
    pub description: String,
    pub budget_cents: i64,
    pub status: MissionStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mission request body. Every field is optional on the wire so missing
/// values surface as field-level validation errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateMission {
    pub business_id: i64,
    pub client_email: Option<String>,
    pub client_name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub budget_cents: i64,
    pub deadline: Option<DateTime<Utc>>,
}

/// Validated data for inserting a mission.
#[derive(Debug, Clone)]
pub struct NewMission {
    pub business_id: i64,
    pub client_id: i64,
    pub client_email: String,
    pub client_name: Option<String>,
    pub title: String,
    pub description: String,
    pub budget_cents: i64,
    pub deadline: Option<DateTime<Utc>>,
}

/// Status change requested by a participant.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MissionStatusUpdate {
    pub status: MissionStatus,
}

/// Message body posted to a mission thread.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MissionMessageInput {
    pub body: String,
}

/// Which side of a mission the caller is listing from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionParty {
    #[default]
    Client,
    Freelancer,
}

/// A message in a mission's thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionMessage {
    pub id: i64,
    pub mission_id: i64,
    pub sender_id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Local mirror of funds captured by the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub mission_id: i64,
    pub amount_cents: i64,
    pub platform_fee_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub checkout_session_id: String,
    pub transfer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Amount paid out to the freelancer on release.
    #[must_use]
    pub const fn payout_cents(&self) -> i64 {
        self.amount_cents - self.platform_fee_cents
    }
}

/// Data for recording a confirmed checkout.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub mission_id: i64,
    pub amount_cents: i64,
    pub platform_fee_cents: i64,
    pub currency: String,
    pub checkout_session_id: String,
}

/// A mission with its latest payment, as shown to participants.
#[derive(Debug, Clone, Serialize)]
pub struct MissionView {
    #[serde(flatten)]
    pub mission: MissionRequest,
    pub payment: Option<Payment>,
}

/// Largest accepted mission budget, in minor units.
pub const MAX_BUDGET_CENTS: i64 = 100_000_000_000;

/// Compute the platform's cut in minor units, rounding down.
///
/// Saturates rather than overflowing for out-of-range amounts.
#[must_use]
pub const fn platform_fee(amount_cents: i64, fee_bps: u32) -> i64 {
    let fee = amount_cents as i128 * fee_bps as i128 / 10_000;
    if fee > i64::MAX as i128 {
        i64::MAX
    } else if fee < i64::MIN as i128 {
        i64::MIN
    } else {
        fee as i64
    }
}
