//! `TicketService`: ticket mutations followed by live-update events.
//!
//! Every mutation persists first and publishes second. A publish is a
//! fire-and-forget hand-off; it cannot fail the mutation that triggered it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use maintix_core::{
    Comment, CommentId, EventPublisher, Ticket, TicketCategory, TicketEvent, TicketId,
    TicketPriority, TicketStatus, UserId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::errors::{Result, TicketError};
use crate::repository::{
    CommentRepository, TicketFilter, TicketRepository, TicketStats, UserRepository,
};

/// Fields supplied when filing a ticket.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    /// Short summary. Must not be blank.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Urgency.
    #[serde(default)]
    pub priority: TicketPriority,
    /// Trade category.
    #[serde(default)]
    pub category: TicketCategory,
    /// Where the problem is.
    #[serde(default)]
    pub location: Option<String>,
    /// Requested completion date.
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial edit of a ticket. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TicketUpdate {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New status.
    pub status: Option<TicketStatus>,
    /// New priority.
    pub priority: Option<TicketPriority>,
}

/// Ticket operations over pluggable repositories.
pub struct TicketService {
    tickets: Arc<dyn TicketRepository>,
    comments: Arc<dyn CommentRepository>,
    users: Arc<dyn UserRepository>,
    publisher: Option<Arc<dyn EventPublisher>>,
}

impl TicketService {
    /// Create a service with no event publisher.
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        comments: Arc<dyn CommentRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            tickets,
            comments,
            users,
            publisher: None,
        }
    }

    /// Publish mutation events to `publisher`.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// File a new ticket. It starts `OPEN`.
    #[instrument(skip_all, fields(created_by = %created_by))]
    pub async fn create(&self, input: NewTicket, created_by: UserId) -> Result<Ticket> {
        if input.title.trim().is_empty() {
            return Err(TicketError::Invalid("title must not be empty".into()));
        }
        let now = Utc::now();
        let ticket = Ticket {
            id: TicketId::new(),
            title: input.title,
            description: input.description,
            status: TicketStatus::Open,
            priority: input.priority,
            category: input.category,
            location: input.location,
            created_by_id: created_by,
            assigned_to_id: None,
            due_date: input.due_date,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        };
        self.tickets.create(&ticket).await?;
        info!(ticket_id = %ticket.id, "ticket created");

        self.publish(TicketEvent::Created(ticket.clone()));
        Ok(ticket)
    }

    /// Look up a ticket.
    pub async fn get(&self, id: &TicketId) -> Result<Ticket> {
        self.tickets
            .find_by_id(id)
            .await?
            .ok_or_else(|| TicketError::NotFound(id.clone()))
    }

    /// One page of matching tickets plus the total match count.
    pub async fn list(&self, filter: &TicketFilter) -> Result<(Vec<Ticket>, usize)> {
        self.tickets.find_all(filter).await
    }

    /// Apply a partial edit.
    #[instrument(skip_all, fields(ticket_id = %id, editor = %editor))]
    pub async fn update(&self, id: &TicketId, changes: TicketUpdate, editor: &UserId) -> Result<Ticket> {
        let mut ticket = self.get(id).await?;
        let now = Utc::now();

        if let Some(title) = changes.title {
            if title.trim().is_empty() {
                return Err(TicketError::Invalid("title must not be empty".into()));
            }
            ticket.title = title;
        }
        if let Some(description) = changes.description {
            ticket.description = description;
        }
        if let Some(status) = changes.status {
            ticket.status = status;
            if status == TicketStatus::Resolved {
                ticket.resolved_at = Some(now);
            }
        }
        if let Some(priority) = changes.priority {
            ticket.priority = priority;
        }
        ticket.updated_at = now;

        self.tickets.update(&ticket).await?;
        info!(status = ticket.status.as_str(), "ticket updated");

        self.publish(TicketEvent::Updated(ticket.clone()));
        Ok(ticket)
    }

    /// Remove a ticket.
    #[instrument(skip_all, fields(ticket_id = %id))]
    pub async fn delete(&self, id: &TicketId) -> Result<()> {
        self.tickets.delete(id).await?;
        info!("ticket deleted");

        self.publish(TicketEvent::Deleted(id.clone()));
        Ok(())
    }

    /// Assign a technician and move the ticket to `IN_PROGRESS`.
    #[instrument(skip_all, fields(ticket_id = %ticket_id, technician = %technician_id))]
    pub async fn assign_technician(&self, ticket_id: &TicketId, technician_id: &UserId) -> Result<Ticket> {
        let mut ticket = self.get(ticket_id).await?;

        let technician = self
            .users
            .find_by_id(technician_id)
            .await?
            .ok_or_else(|| TicketError::TechnicianNotFound(technician_id.clone()))?;
        if !technician.role.can_take_assignments() {
            return Err(TicketError::NotATechnician(technician_id.clone()));
        }

        ticket.assigned_to_id = Some(technician.id);
        ticket.status = TicketStatus::InProgress;
        ticket.updated_at = Utc::now();

        self.tickets.update(&ticket).await?;
        info!("technician assigned");

        self.publish(TicketEvent::Updated(ticket.clone()));
        Ok(ticket)
    }

    /// Leave a comment on a ticket. Comments are not broadcast.
    pub async fn add_comment(&self, ticket_id: &TicketId, author: UserId, content: String) -> Result<Comment> {
        if content.trim().is_empty() {
            return Err(TicketError::Invalid("comment must not be empty".into()));
        }
        let _ = self.get(ticket_id).await?;

        let comment = Comment {
            id: CommentId::new(),
            ticket_id: ticket_id.clone(),
            user_id: author,
            content,
            created_at: Utc::now(),
        };
        self.comments.create(&comment).await?;
        debug!(ticket_id = %ticket_id, comment_id = %comment.id, "comment added");
        Ok(comment)
    }

    /// Comments on a ticket, oldest first.
    pub async fn comments(&self, ticket_id: &TicketId) -> Result<Vec<Comment>> {
        self.comments.find_by_ticket(ticket_id).await
    }

    /// Ticket counts by status.
    pub async fn stats(&self) -> Result<TicketStats> {
        self.tickets.stats().await
    }

    fn publish(&self, event: TicketEvent) {
        if let Some(publisher) = &self.publisher {
            publisher.publish(&event);
        }
    }
}
