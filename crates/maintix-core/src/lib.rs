//! # maintix-core
//!
//! Shared vocabulary for the maintix workspace.
//!
//! - Branded identifiers ([`ids`])
//! - Ticket, comment, and user domain types ([`ticket`])
//! - Ticket change events and the [`EventPublisher`] seam ([`events`])

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod ticket;

pub use events::{EventPayload, EventPublisher, TicketEvent};
pub use ids::{CommentId, ConnectionId, TicketId, UserId};
pub use ticket::{
    Comment, Ticket, TicketCategory, TicketPriority, TicketStatus, User, UserRole,
};
