//! Storage seams for tickets, comments, and users.
//!
//! Persistence lives outside this crate; these traits are the interfaces the
//! service expects from it. [`crate::memory`] provides in-process versions.

use async_trait::async_trait;
use maintix_core::{Comment, Ticket, TicketCategory, TicketId, TicketPriority, TicketStatus, User, UserId};
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Default page size when a filter does not set one.
pub const DEFAULT_PAGE_LIMIT: usize = 10;

/// Criteria for listing tickets. Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TicketFilter {
    /// Match this status only.
    pub status: Option<TicketStatus>,
    /// Match this priority only.
    pub priority: Option<TicketPriority>,
    /// Match this category only.
    pub category: Option<TicketCategory>,
    /// Match tickets assigned to this user.
    pub assigned_to_id: Option<UserId>,
    /// Match tickets filed by this user.
    pub created_by_id: Option<UserId>,
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
    /// 1-based page number; `0` means the first page.
    pub page: usize,
    /// Page size; `0` means [`DEFAULT_PAGE_LIMIT`].
    pub limit: usize,
}

impl TicketFilter {
    /// Effective `(offset, limit)` after applying defaults.
    pub fn window(&self) -> (usize, usize) {
        let limit = if self.limit == 0 { DEFAULT_PAGE_LIMIT } else { self.limit };
        let page = self.page.max(1);
        ((page - 1).saturating_mul(limit), limit)
    }

    /// Whether `ticket` satisfies every set criterion.
    pub fn matches(&self, ticket: &Ticket) -> bool {
        if self.status.is_some_and(|s| s != ticket.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != ticket.priority) {
            return false;
        }
        if self.category.is_some_and(|c| c != ticket.category) {
            return false;
        }
        if let Some(ref assignee) = self.assigned_to_id {
            if ticket.assigned_to_id.as_ref() != Some(assignee) {
                return false;
            }
        }
        if let Some(ref reporter) = self.created_by_id {
            if &ticket.created_by_id != reporter {
                return false;
            }
        }
        if let Some(ref needle) = self.search {
            let needle = needle.to_lowercase();
            if !ticket.title.to_lowercase().contains(&needle)
                && !ticket.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// Ticket counts for dashboards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketStats {
    /// All tickets.
    pub total: usize,
    /// Status `OPEN`.
    pub open: usize,
    /// Status `IN_PROGRESS`.
    pub in_progress: usize,
    /// Status `RESOLVED`.
    pub resolved: usize,
}

/// Ticket persistence.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Store a new ticket.
    async fn create(&self, ticket: &Ticket) -> Result<()>;
    /// Look up a ticket.
    async fn find_by_id(&self, id: &TicketId) -> Result<Option<Ticket>>;
    /// One page of matching tickets, newest first, plus the total match count.
    async fn find_all(&self, filter: &TicketFilter) -> Result<(Vec<Ticket>, usize)>;
    /// Replace a stored ticket. Fails with `NotFound` if absent.
    async fn update(&self, ticket: &Ticket) -> Result<()>;
    /// Remove a ticket. Fails with `NotFound` if absent.
    async fn delete(&self, id: &TicketId) -> Result<()>;
    /// Counts by status.
    async fn stats(&self) -> Result<TicketStats>;
}

/// Comment persistence.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Store a new comment.
    async fn create(&self, comment: &Comment) -> Result<()>;
    /// Comments on a ticket, oldest first.
    async fn find_by_ticket(&self, ticket_id: &TicketId) -> Result<Vec<Comment>>;
}

/// User lookup.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up a user.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ticket(title: &str, status: TicketStatus) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: TicketId::new(),
            title: title.into(),
            description: "north wing".into(),
            status,
            priority: TicketPriority::Medium,
            category: TicketCategory::General,
            location: None,
            created_by_id: UserId::from_raw("u1"),
            assigned_to_id: None,
            due_date: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn window_defaults() {
        assert_eq!(TicketFilter::default().window(), (0, DEFAULT_PAGE_LIMIT));
        let f = TicketFilter { page: 3, limit: 5, ..TicketFilter::default() };
        assert_eq!(f.window(), (10, 5));
    }

    #[test]
    fn window_saturates_on_huge_page() {
        let f: TicketFilter =
            serde_json::from_str(r#"{"page":18446744073709551615,"limit":100}"#).unwrap();
        assert_eq!(f.window(), (usize::MAX, 100));
    }

    #[test]
    fn filter_reads_camel_case_query() {
        let f: TicketFilter = serde_json::from_str(
            r#"{"status":"IN_PROGRESS","assignedToId":"tech","category":"HVAC","page":2}"#,
        )
        .unwrap();
        assert_eq!(f.status, Some(TicketStatus::InProgress));
        assert_eq!(f.assigned_to_id, Some(UserId::from_raw("tech")));
        assert_eq!(f.category, Some(TicketCategory::Hvac));
        assert_eq!(f.window(), (DEFAULT_PAGE_LIMIT, DEFAULT_PAGE_LIMIT));
    }

    #[test]
    fn empty_filter_matches_all() {
        assert!(TicketFilter::default().matches(&ticket("x", TicketStatus::Closed)));
    }

    #[test]
    fn status_filter() {
        let f = TicketFilter { status: Some(TicketStatus::Open), ..TicketFilter::default() };
        assert!(f.matches(&ticket("x", TicketStatus::Open)));
        assert!(!f.matches(&ticket("x", TicketStatus::Resolved)));
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let f = TicketFilter { search: Some("BOILER".into()), ..TicketFilter::default() };
        assert!(f.matches(&ticket("Boiler noise", TicketStatus::Open)));
        let f = TicketFilter { search: Some("North".into()), ..TicketFilter::default() };
        assert!(f.matches(&ticket("Boiler noise", TicketStatus::Open)));
        let f = TicketFilter { search: Some("roof".into()), ..TicketFilter::default() };
        assert!(!f.matches(&ticket("Boiler noise", TicketStatus::Open)));
    }

    #[test]
    fn assignee_filter_excludes_unassigned() {
        let f = TicketFilter {
            assigned_to_id: Some(UserId::from_raw("tech")),
            ..TicketFilter::default()
        };
        let mut t = ticket("x", TicketStatus::InProgress);
        assert!(!f.matches(&t));
        t.assigned_to_id = Some(UserId::from_raw("tech"));
        assert!(f.matches(&t));
    }
}
