//! Ticket, comment, and user domain types.
//!
//! Wire format is camelCase JSON with SCREAMING_SNAKE enum values, matching
//! what the web client already consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CommentId, TicketId, UserId};

/// Lifecycle status of a ticket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    /// Newly filed, not yet picked up.
    #[default]
    Open,
    /// A technician is working on it.
    InProgress,
    /// Waiting on a third party or the reporter.
    Pending,
    /// Work finished; `resolved_at` is set.
    Resolved,
    /// Closed out.
    Closed,
}

impl TicketStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Open,
        Self::InProgress,
        Self::Pending,
        Self::Resolved,
        Self::Closed,
    ];

    /// Wire name (`"IN_PROGRESS"`, …).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::Pending => "PENDING",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
        }
    }
}

/// Ticket urgency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketPriority {
    /// Can wait.
    Low,
    /// Default priority.
    #[default]
    Medium,
    /// Should be handled soon.
    High,
    /// Drop everything.
    Critical,
}

/// Trade the ticket belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketCategory {
    /// Electrical work.
    Electrical,
    /// Plumbing.
    Plumbing,
    /// Heating, ventilation, air conditioning.
    #[serde(rename = "HVAC")]
    Hvac,
    /// IT equipment.
    #[serde(rename = "IT")]
    It,
    /// General maintenance (default).
    #[default]
    General,
    /// Anything else.
    Other,
}

/// A maintenance ticket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Ticket identifier.
    pub id: TicketId,
    /// Short summary.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Current status.
    pub status: TicketStatus,
    /// Urgency.
    pub priority: TicketPriority,
    /// Trade category.
    pub category: TicketCategory,
    /// Where the problem is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Reporter.
    pub created_by_id: UserId,
    /// Assigned technician, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<UserId>,
    /// Requested completion date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    /// Set when the ticket moves to [`TicketStatus::Resolved`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// A comment left on a ticket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Comment identifier.
    pub id: CommentId,
    /// Ticket the comment belongs to.
    pub ticket_id: TicketId,
    /// Author.
    pub user_id: UserId,
    /// Comment body.
    pub content: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Role of a user account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Regular reporter.
    #[default]
    User,
    /// Maintenance technician.
    Technician,
    /// Administrator.
    Admin,
}

impl UserRole {
    /// Whether a user with this role may be assigned tickets.
    pub fn can_take_assignments(self) -> bool {
        matches!(self, Self::Technician | Self::Admin)
    }
}

/// A user account, as far as ticket handling is concerned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Account role.
    pub role: UserRole,
}
