//! # openescrow-lifecycle
//!
//! The trade lifecycle services: order intake, the escrow creation saga,
//! the payment/release flow, dispute resolution, reconciliation, and
//! monitoring.
//!
//! Every service holds the same two handles — the shared [`Ledger`] of
//! local tables and a [`CustodianGateway`] to the exchange that actually
//! custodies the funds. Local state changes are compare-and-set; custodian
//! calls are at-most-once-uncertain, with unknown outcomes parked in a
//! sub-status and settled by the [`ReconciliationEngine`].
//!
//! [`Ledger`]: openescrow_store::Ledger
//! [`CustodianGateway`]: openescrow_custodian::CustodianGateway

pub mod dispute;
pub mod escrow_service;
pub mod monitoring;
pub mod orders;
pub mod reconciliation;
pub mod trade_flow;

pub use dispute::DisputeResolver;
pub use escrow_service::{EscrowService, SweepReport};
pub use monitoring::{raise_critical, Monitor, ScanReport};
pub use orders::{OrderIntake, OrderRequest};
pub use reconciliation::{ReconciliationEngine, ReconciliationReport};
pub use trade_flow::TradeFlow;
