//! Domain types for the marketplace.
//!
//! These are pure data structures with no infrastructure dependencies.
//! Status-like enums share a single string representation used both on the
//! wire (JSON) and in storage.

/// Declares a `Copy` enum with a fixed string form per variant.
///
/// Generates `parse`, `as_str` and `Display`, and wires serde to the same
/// strings so the stored and serialized forms never diverge.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Parse from the stored string form.
            #[must_use]
            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// The stored string form.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod agent;
pub mod business;
pub mod media;
pub mod mission;
pub mod user;
pub mod workspace;

pub use agent::{
    AgentChatRequest, AgentConversation, AgentMessage, AgentReply, AgentTranscript, MessageRole,
};
pub use business::{
    Business, BusinessDetail, BusinessProfile, BusinessSearch, NewBusiness, NewReview, Review,
    ReviewInput, SearchPage, Service, ServiceInput, SubscriptionTier, VerificationStatus,
};
pub use media::{Media, NewMedia, UploadedFile};
pub use mission::{
    CreateMission, MAX_BUDGET_CENTS, MissionMessage, MissionMessageInput, MissionParty, MissionRequest, MissionStatus,
    MissionStatusUpdate, MissionView, NewMission, NewPayment, Payment, PaymentStatus, platform_fee,
};
pub use user::{
    AuthSession, LoginRequest, NewSession, NewUser, RegisterRequest, SubscriptionCheckout,
    SubscriptionStatus, User, UserRole,
};
pub use workspace::{
    CalendarEvent, Client, ClientInput, EventInput, EventRange, Invoice, InvoiceInput,
    InvoiceItem, InvoiceItemInput, InvoiceStatus, InvoiceStatusUpdate, InvoiceTotals,
    MAX_INVOICE_ITEMS, MAX_ITEM_QUANTITY, MAX_UNIT_PRICE_CENTS, Project, ProjectInput,
    ProjectStatus, StartTimer, Task, TaskInput, TaskPriority, TaskStatus, TimeEntry,
    TimeEntryInput, WorkspaceSummary, line_amount,
};
