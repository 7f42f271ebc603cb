//! Globally unique identifiers used throughout OpenEscrow.
//!
//! All locally-minted entity IDs use UUIDv7 for time-ordered lexicographic
//! sorting. Custodian-side identifiers (`AccountRef`, `TransferId`) are
//! opaque strings assigned by the external exchange.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
        )]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            #[must_use]
            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }

            /// Extract the embedded timestamp (milliseconds since UNIX epoch).
            #[must_use]
            pub fn timestamp_ms(&self) -> u64 {
                let b = self.0.as_bytes();
                u64::from_be_bytes([0, 0, b[0], b[1], b[2], b[3], b[4], b[5]])
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if $prefix.is_empty() {
                    write!(f, "{}", self.0)
                } else {
                    write!(f, "{}:{}", $prefix, self.0)
                }
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a platform user.
    UserId,
    ""
);
uuid_id!(
    /// Globally unique order identifier.
    OrderId,
    ""
);
uuid_id!(
    /// Globally unique trade identifier.
    TradeId,
    ""
);
uuid_id!(
    /// Unique identifier for an escrow record.
    EscrowId,
    "esc"
);
uuid_id!(
    /// Unique identifier for a dispute.
    DisputeId,
    "dsp"
);
uuid_id!(
    /// Unique identifier for a monitoring alert.
    AlertId,
    "alr"
);

// ---------------------------------------------------------------------------
// AccountRef
// ---------------------------------------------------------------------------

/// Reference to a custodian sub-account (one per platform user, plus the
/// platform escrow wallet). Assigned by the custodian; treated as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountRef(pub String);

impl AccountRef {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acct:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TransferId
// ---------------------------------------------------------------------------

/// Custodian-assigned identifier for an internal transfer or ledger entry.
/// The reconciliation engine keys the local transaction log by this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TransferId(pub String);

impl TransferId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(OrderId::new(), OrderId::new());
        assert_ne!(TradeId::new(), TradeId::new());
        assert_ne!(EscrowId::new(), EscrowId::new());
    }

    #[test]
    fn ids_are_time_ordered() {
        let a = TradeId::new();
        let b = TradeId::new();
        assert!(a < b);
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn timestamp_extraction() {
        let before = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let id = OrderId::new();
        let after = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let ts = id.timestamp_ms();
        assert!(ts >= before && ts <= after, "ts={ts} not in [{before}, {after}]");
    }

    #[test]
    fn display_prefixes() {
        let esc = EscrowId::new();
        assert!(esc.to_string().starts_with("esc:"));
        let acct = AccountRef::new("sub_123");
        assert_eq!(acct.to_string(), "acct:sub_123");
    }

    #[test]
    fn serde_roundtrips() {
        let id = TradeId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: TradeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);

        let tid = TransferId::new("bn_9f3a");
        let json = serde_json::to_string(&tid).unwrap();
        let back: TransferId = serde_json::from_str(&json).unwrap();
        assert_eq!(tid, back);
    }
}
