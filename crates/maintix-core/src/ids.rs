//! Branded identifier newtypes.
//!
//! Every identifier is a prefixed UUID v7 string (`tkt_…`, `usr_…`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh identifier.
            pub fn new() -> Self {
                Self(format!("{}_{}", $prefix, Uuid::now_v7()))
            }

            /// Wrap an existing identifier string without validation.
            pub fn from_raw(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

branded_id!(
    /// Identifier of a maintenance ticket.
    TicketId,
    "tkt"
);
branded_id!(
    /// Identifier of a user (reporter, technician, or admin).
    UserId,
    "usr"
);
branded_id!(
    /// Identifier of a ticket comment.
    CommentId,
    "cmt"
);
branded_id!(
    /// Opaque identifier of one live-update connection.
    ConnectionId,
    "conn"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_id_has_prefix() {
        let id = TicketId::new();
        assert!(id.as_str().starts_with("tkt_"), "got: {id}");
    }

    #[test]
    fn user_id_has_prefix() {
        let id = UserId::new();
        assert!(id.as_str().starts_with("usr_"), "got: {id}");
    }

    #[test]
    fn connection_id_has_prefix() {
        let id = ConnectionId::new();
        assert!(id.as_str().starts_with("conn_"), "got: {id}");
    }

    #[test]
    fn ids_are_unique() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn serializes_as_bare_string() {
        let id = TicketId::from_raw("t1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"t1\"");
    }

    #[test]
    fn from_raw_preserves_value() {
        let id = CommentId::from_raw("custom-id-123");
        assert_eq!(id.as_str(), "custom-id-123");
        let parsed: CommentId = "custom-id-123".parse().unwrap();
        assert_eq!(id, parsed);
    }
}
