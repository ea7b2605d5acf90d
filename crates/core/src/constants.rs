//! Shared constants for mitch.

/// Longest identifier PostgreSQL keeps without truncation (`NAMEDATALEN - 1`).
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Schema an unqualified table name resolves to.
pub const DEFAULT_SCHEMA: &str = "public";

/// PostgreSQL connection pool: maximum connections. A run borrows exactly one.
pub const PG_POOL_MAX_CONNECTIONS: u32 = 2;

/// Default pool acquire timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Key for `pg_advisory_xact_lock`, serializing concurrent convergence runs.
/// ASCII "mitch".
pub const DEFAULT_LOCK_KEY: i64 = 0x6d_6974_6368;

/// Environment variable holding the pool acquire timeout.
pub const CONNECT_TIMEOUT_ENV: &str = "MITCH_CONNECT_TIMEOUT_SECS";

/// Environment variable overriding the advisory lock key.
pub const LOCK_KEY_ENV: &str = "MITCH_LOCK_KEY";
