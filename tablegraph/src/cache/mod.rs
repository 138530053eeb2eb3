// SPDX-License-Identifier: AGPL-3.0-or-later

//! Read-through result cache sitting in front of every generated query.
//!
//! Entries carry a fixed time-to-live and are never invalidated by writes, the TTL is the only
//! staleness bound. The facade tolerates a tiered backing (fast bounded local tier plus a
//! larger shared tier), callers never learn which tier served a hit. An unreachable store is
//! treated as a forced miss and never fails a request.
mod key;
mod store;

pub use key::QueryCacheKey;
pub use store::{CacheError, CacheStore, MemoryStore, ResultCache};

/// Time-to-live applied to every cached query result.
pub const RESULT_TTL: std::time::Duration = std::time::Duration::from_secs(60);
