//! Set operations.

use crate::client::{require_some, CacheClient};
use crate::command::Command;
use crate::error::ClientResult;

impl CacheClient {
    /// Adds `members` to the set at `key`, then applies `ttl` when positive.
    /// Re-adding an existing member leaves the cardinality unchanged.
    pub fn sadd(&self, key: &str, ttl: i64, members: &[&[u8]]) -> ClientResult<()> {
        require_some("SADD", members)?;
        self.write_with_ttl(Command::new("SADD").arg(key).args(members), key, ttl)
    }

    /// Removes `members`; returns how many were present.
    pub fn srem(&self, key: &str, members: &[&[u8]]) -> ClientResult<i64> {
        require_some("SREM", members)?;
        self.query(Command::new("SREM").arg(key).args(members))
    }

    /// Cardinality of the set; 0 for a missing key.
    pub fn scard(&self, key: &str) -> ClientResult<i64> {
        self.query(Command::new("SCARD").arg(key))
    }

    pub fn sismember(&self, key: &str, member: &[u8]) -> ClientResult<bool> {
        self.query(Command::new("SISMEMBER").arg(key).arg(member))
    }

    /// All members in store order (unordered for sets).
    pub fn smembers(&self, key: &str) -> ClientResult<Vec<Vec<u8>>> {
        self.query(Command::new("SMEMBERS").arg(key))
    }
}
