//! In-process repositories, for tests and single-node demos.

use std::collections::HashMap;

use async_trait::async_trait;
use maintix_core::{Comment, Ticket, TicketId, TicketStatus, User, UserId};
use parking_lot::RwLock;

use crate::errors::{Result, TicketError};
use crate::repository::{
    CommentRepository, TicketFilter, TicketRepository, TicketStats, UserRepository,
};

/// Tickets held in a map.
#[derive(Default)]
pub struct InMemoryTicketRepository {
    tickets: RwLock<HashMap<TicketId, Ticket>>,
}

impl InMemoryTicketRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn create(&self, ticket: &Ticket) -> Result<()> {
        let mut tickets = self.tickets.write();
        if tickets.contains_key(&ticket.id) {
            return Err(TicketError::Repository(format!("duplicate ticket id {}", ticket.id)));
        }
        let _ = tickets.insert(ticket.id.clone(), ticket.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &TicketId) -> Result<Option<Ticket>> {
        Ok(self.tickets.read().get(id).cloned())
    }

    async fn find_all(&self, filter: &TicketFilter) -> Result<(Vec<Ticket>, usize)> {
        let mut matched: Vec<Ticket> = self
            .tickets
            .read()
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        let total = matched.len();
        let (offset, limit) = filter.window();
        let page = matched.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    async fn update(&self, ticket: &Ticket) -> Result<()> {
        let mut tickets = self.tickets.write();
        match tickets.get_mut(&ticket.id) {
            Some(slot) => {
                *slot = ticket.clone();
                Ok(())
            }
            None => Err(TicketError::NotFound(ticket.id.clone())),
        }
    }

    async fn delete(&self, id: &TicketId) -> Result<()> {
        self.tickets
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| TicketError::NotFound(id.clone()))
    }

    async fn stats(&self) -> Result<TicketStats> {
        let tickets = self.tickets.read();
        let count = |status: TicketStatus| tickets.values().filter(|t| t.status == status).count();
        Ok(TicketStats {
            total: tickets.len(),
            open: count(TicketStatus::Open),
            in_progress: count(TicketStatus::InProgress),
            resolved: count(TicketStatus::Resolved),
        })
    }
}

/// Comments held in a list.
#[derive(Default)]
pub struct InMemoryCommentRepository {
    comments: RwLock<Vec<Comment>>,
}

impl InMemoryCommentRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<()> {
        self.comments.write().push(comment.clone());
        Ok(())
    }

    async fn find_by_ticket(&self, ticket_id: &TicketId) -> Result<Vec<Comment>> {
        Ok(self
            .comments
            .read()
            .iter()
            .filter(|c| &c.ticket_id == ticket_id)
            .cloned()
            .collect())
    }
}

/// Users held in a map, seeded up front.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    /// Create a repository holding `users`.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.id.clone(), u)).collect()),
        }
    }

    /// Add or replace a user.
    pub fn insert(&self, user: User) {
        let _ = self.users.write().insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.users.read().get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};
    use maintix_core::{TicketCategory, TicketPriority, UserRole};

    fn ticket(minutes_ago: i64, status: TicketStatus) -> Ticket {
        let at = Utc::now() - Duration::minutes(minutes_ago);
        Ticket {
            id: TicketId::new(),
            title: format!("ticket {minutes_ago}"),
            description: String::new(),
            status,
            priority: TicketPriority::Low,
            category: TicketCategory::It,
            location: None,
            created_by_id: UserId::from_raw("u1"),
            assigned_to_id: None,
            due_date: None,
            resolved_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn create_find_update_delete() {
        let repo = InMemoryTicketRepository::new();
        let mut t = ticket(0, TicketStatus::Open);
        repo.create(&t).await.unwrap();
        assert_eq!(repo.find_by_id(&t.id).await.unwrap(), Some(t.clone()));

        t.title = "renamed".into();
        repo.update(&t).await.unwrap();
        assert_eq!(repo.find_by_id(&t.id).await.unwrap().unwrap().title, "renamed");

        repo.delete(&t.id).await.unwrap();
        assert!(repo.find_by_id(&t.id).await.unwrap().is_none());
        assert_matches!(repo.delete(&t.id).await, Err(TicketError::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_create_rejected() {
        let repo = InMemoryTicketRepository::new();
        let t = ticket(0, TicketStatus::Open);
        repo.create(&t).await.unwrap();
        assert_matches!(repo.create(&t).await, Err(TicketError::Repository(_)));
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let repo = InMemoryTicketRepository::new();
        assert_matches!(
            repo.update(&ticket(0, TicketStatus::Open)).await,
            Err(TicketError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn find_all_newest_first_with_paging() {
        let repo = InMemoryTicketRepository::new();
        for minutes in [30, 10, 20] {
            repo.create(&ticket(minutes, TicketStatus::Open)).await.unwrap();
        }

        let filter = TicketFilter { limit: 2, ..TicketFilter::default() };
        let (page, total) = repo.find_all(&filter).await.unwrap();
        assert_eq!(total, 3);
        let titles: Vec<_> = page.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["ticket 10", "ticket 20"]);

        let filter = TicketFilter { limit: 2, page: 2, ..TicketFilter::default() };
        let (page, _) = repo.find_all(&filter).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "ticket 30");
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty() {
        let repo = InMemoryTicketRepository::new();
        repo.create(&ticket(0, TicketStatus::Open)).await.unwrap();
        let filter = TicketFilter { page: usize::MAX, limit: 50, ..TicketFilter::default() };
        let (page, total) = repo.find_all(&filter).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn stats_count_by_status() {
        let repo = InMemoryTicketRepository::new();
        for status in [
            TicketStatus::Open,
            TicketStatus::Open,
            TicketStatus::InProgress,
            TicketStatus::Resolved,
            TicketStatus::Closed,
        ] {
            repo.create(&ticket(0, status)).await.unwrap();
        }
        let stats = repo.stats().await.unwrap();
        assert_eq!(
            stats,
            TicketStats { total: 5, open: 2, in_progress: 1, resolved: 1 }
        );
    }

    #[tokio::test]
    async fn comments_scoped_to_ticket() {
        let repo = InMemoryCommentRepository::new();
        let t1 = TicketId::from_raw("t1");
        for (ticket_id, content) in [(&t1, "first"), (&TicketId::from_raw("t2"), "other"), (&t1, "second")] {
            repo.create(&Comment {
                id: maintix_core::CommentId::new(),
                ticket_id: ticket_id.clone(),
                user_id: UserId::from_raw("u1"),
                content: content.into(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        }
        let found = repo.find_by_ticket(&t1).await.unwrap();
        let contents: Vec<_> = found.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, ["first", "second"]);
    }

    #[tokio::test]
    async fn users_lookup() {
        let repo = InMemoryUserRepository::with_users([User {
            id: UserId::from_raw("tech"),
            name: "Tess".into(),
            email: "tess@example.com".into(),
            role: UserRole::Technician,
        }]);
        assert!(repo.find_by_id(&UserId::from_raw("tech")).await.unwrap().is_some());
        assert!(repo.find_by_id(&UserId::from_raw("nobody")).await.unwrap().is_none());
    }
}
