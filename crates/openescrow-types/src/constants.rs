//! System-wide constants and defaults.

/// Default payment window granted to the buyer, in minutes.
pub const DEFAULT_PAYMENT_WINDOW_MINUTES: i64 = 30;

/// How long a timed-out custodian transfer may stay unverified before the
/// reconciliation engine compensates it, in minutes.
pub const DEFAULT_VERIFICATION_WINDOW_MINUTES: i64 = 60;

/// Default interval between expiry-sweep runs, in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Default per-call custodian RPC timeout, in milliseconds.
pub const DEFAULT_CUSTODIAN_TIMEOUT_MS: u64 = 5_000;

/// Length of the buyer-facing escrow confirmation code.
pub const CONFIRMATION_CODE_LEN: usize = 8;

/// Default fiat currency for pricing and order windows.
pub const DEFAULT_FIAT_CURRENCY: &str = "NGN";

/// Default custodian sub-account name for the platform escrow wallet.
pub const DEFAULT_ESCROW_WALLET: &str = "platform_escrow";
