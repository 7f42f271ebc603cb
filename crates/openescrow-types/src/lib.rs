//! # openescrow-types
//!
//! Shared types, errors, and configuration for the **OpenEscrow** P2P
//! escrow trade-lifecycle engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`UserId`], [`TradeId`], [`EscrowId`],
//!   [`DisputeId`], [`AlertId`], [`AccountRef`], [`TransferId`]
//! - **Order model**: [`Order`], [`OrderSide`], [`OrderStatus`]
//! - **Trade model**: [`Trade`], [`TradeStatus`], [`TradeSubStatus`]
//! - **Escrow model**: [`Escrow`], [`EscrowStatus`]
//! - **Dispute model**: [`Dispute`], [`DisputeStatus`], [`DisputeOutcome`]
//! - **Ledger mirror**: [`WalletMirror`], [`ExternalTransaction`],
//!   [`ReconciliationRecord`]
//! - **Monitoring**: [`Alert`], [`AlertKind`], [`Severity`]
//! - **Authorization**: [`Role`], [`Permission`]
//! - **Configuration**: [`PlatformConfig`], [`CustodianConfig`],
//!   [`MonitorThresholds`]
//! - **Errors**: [`OpenescrowError`] with `OE_ERR_` prefix codes

pub mod alert;
pub mod config;
pub mod constants;
pub mod dispute;
pub mod error;
pub mod escrow;
pub mod ids;
pub mod order;
pub mod role;
pub mod trade;
pub mod wallet;

// Re-export all primary types at crate root for ergonomic imports:
//   use openescrow_types::{Order, Trade, Escrow, ...};

pub use alert::*;
pub use config::*;
pub use dispute::*;
pub use error::*;
pub use escrow::*;
pub use ids::*;
pub use order::*;
pub use role::*;
pub use trade::*;
pub use wallet::*;

// Constants are accessed via `openescrow_types::constants::FOO`
// (not re-exported to avoid name collisions).
