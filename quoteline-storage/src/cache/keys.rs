//! Fast-store key scheme for staged mutations and the aggregate entry.

use std::fmt;

use quoteline_core::TransactionId;
use uuid::Uuid;

/// Prefix of every staged create.
pub const PENDING_CREATE_PREFIX: &str = "pending_create_tx:";

/// Prefix of every staged status update.
pub const PENDING_UPDATE_PREFIX: &str = "pending_update_tx:";

/// The single key holding the serialized transaction list.
pub const ALL_TRANSACTIONS_KEY: &str = "all_transactions";

/// Kind of staged mutation, one per key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingKind {
    Create,
    Update,
}

impl PendingKind {
    pub const ALL: [PendingKind; 2] = [PendingKind::Create, PendingKind::Update];

    /// Key prefix the kind is staged under.
    pub fn prefix(self) -> &'static str {
        match self {
            PendingKind::Create => PENDING_CREATE_PREFIX,
            PendingKind::Update => PENDING_UPDATE_PREFIX,
        }
    }

    /// Kind a staged key belongs to, from its prefix.
    pub fn of_key(key: &str) -> Option<PendingKind> {
        PendingKind::ALL
            .into_iter()
            .find(|kind| key.starts_with(kind.prefix()))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PendingKind::Create => "create",
            PendingKind::Update => "update",
        }
    }
}

impl fmt::Display for PendingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generate a fresh, unique key for a staged mutation.
///
/// Transactions without an id yet are staged under `new`.
pub fn pending_key(kind: PendingKind, id: Option<TransactionId>) -> String {
    let suffix = Uuid::now_v7().simple();
    match id {
        Some(id) => format!("{}{}_{}", kind.prefix(), id, suffix),
        None => format!("{}new_{}", kind.prefix(), suffix),
    }
}
