//! Ticket change events pushed to live-update clients.

use serde::Serialize;

use crate::ids::TicketId;
use crate::ticket::Ticket;

/// Event type emitted after a ticket is created.
pub const TICKET_CREATED: &str = "ticket:created";
/// Event type emitted after a ticket is modified or assigned.
pub const TICKET_UPDATED: &str = "ticket:updated";
/// Event type emitted after a ticket is deleted.
pub const TICKET_DELETED: &str = "ticket:deleted";

/// A ticket mutation that clients should hear about.
#[derive(Clone, Debug, PartialEq)]
pub enum TicketEvent {
    /// A new ticket was filed.
    Created(Ticket),
    /// An existing ticket changed.
    Updated(Ticket),
    /// A ticket was removed. Only the id survives.
    Deleted(TicketId),
}

/// Borrowed payload of a [`TicketEvent`], serialized without a tag.
///
/// Created/updated events carry the full ticket object; deleted events carry
/// the bare id string.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum EventPayload<'a> {
    /// Full ticket body.
    Ticket(&'a Ticket),
    /// Ticket identifier only.
    TicketId(&'a TicketId),
}

impl TicketEvent {
    /// Wire event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => TICKET_CREATED,
            Self::Updated(_) => TICKET_UPDATED,
            Self::Deleted(_) => TICKET_DELETED,
        }
    }

    /// Payload to place in the envelope.
    pub fn payload(&self) -> EventPayload<'_> {
        match self {
            Self::Created(ticket) | Self::Updated(ticket) => EventPayload::Ticket(ticket),
            Self::Deleted(id) => EventPayload::TicketId(id),
        }
    }
}

/// Sink for ticket events.
///
/// Implementations must not block: publishing happens inline with the ticket
/// mutation request. Delivery is best-effort.
pub trait EventPublisher: Send + Sync {
    /// Hand an event off for fan-out.
    fn publish(&self, event: &TicketEvent);
}
