//! Ticket service errors.

use maintix_core::{TicketId, UserId};
use thiserror::Error;

/// Errors from ticket operations.
#[derive(Debug, Error)]
pub enum TicketError {
    /// No ticket with this id.
    #[error("ticket not found: {0}")]
    NotFound(TicketId),
    /// The assignee does not exist.
    #[error("technician not found: {0}")]
    TechnicianNotFound(UserId),
    /// The assignee exists but cannot take assignments.
    #[error("assigned user is not a technician: {0}")]
    NotATechnician(UserId),
    /// A field failed validation.
    #[error("invalid ticket: {0}")]
    Invalid(String),
    /// The storage backend failed.
    #[error("repository error: {0}")]
    Repository(String),
}

/// Result type for ticket operations.
pub type Result<T> = std::result::Result<T, TicketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_id() {
        let err = TicketError::NotFound(TicketId::from_raw("t1"));
        assert_eq!(err.to_string(), "ticket not found: t1");
        let err = TicketError::NotATechnician(UserId::from_raw("u9"));
        assert_eq!(err.to_string(), "assigned user is not a technician: u9");
    }
}
