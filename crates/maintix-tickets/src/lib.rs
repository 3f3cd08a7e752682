//! # maintix-tickets
//!
//! Ticket operations that publish a live-update event after each successful
//! mutation.
//!
//! - [`TicketService`]: create, update, delete, assign, comment
//! - [`repository`]: storage traits the service runs against
//! - [`memory`]: in-process repositories

#![deny(unsafe_code)]

pub mod errors;
pub mod memory;
pub mod repository;
pub mod service;

pub use errors::{Result, TicketError};
pub use memory::{InMemoryCommentRepository, InMemoryTicketRepository, InMemoryUserRepository};
pub use repository::{
    CommentRepository, TicketFilter, TicketRepository, TicketStats, UserRepository,
};
pub use service::{NewTicket, TicketService, TicketUpdate};
