//! Hash operations.

use crate::client::{require_pairs, require_some, CacheClient};
use crate::command::Command;
use crate::error::ClientResult;

impl CacheClient {
    /// Sets one field, then applies `ttl` to the whole hash when positive.
    pub fn hset(&self, key: &str, ttl: i64, field: &[u8], value: &[u8]) -> ClientResult<()> {
        self.write_with_ttl(Command::new("HSET").arg(key).arg(field).arg(value), key, ttl)
    }

    /// Value of `field`; empty bytes when the key or field is missing.
    pub fn hget(&self, key: &str, field: &[u8]) -> ClientResult<Vec<u8>> {
        let value: Option<Vec<u8>> = self.query(Command::new("HGET").arg(key).arg(field))?;
        match value {
            Some(data) => Ok(data),
            None => {
                let field = String::from_utf8_lossy(field);
                self.logger()
                    .debug("kvcache hget: no such field", &[("key", &key), ("field", &field)]);
                Ok(Vec::new())
            }
        }
    }

    /// Sets several fields: `args` is `field, value, field, value, ...`.
    ///
    /// An odd-length or empty `args` is rejected before any network call.
    pub fn hmset(&self, key: &str, ttl: i64, args: &[&[u8]]) -> ClientResult<()> {
        require_pairs("HMSET", args)?;
        self.write_with_ttl(Command::new("HMSET").arg(key).args(args), key, ttl)
    }

    /// Values of `fields` in request order; missing fields hold empty bytes.
    pub fn hmget(&self, key: &str, fields: &[&[u8]]) -> ClientResult<Vec<Vec<u8>>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        self.query(Command::new("HMGET").arg(key).args(fields))
    }

    /// Removes `fields`; returns how many existed.
    pub fn hdel(&self, key: &str, fields: &[&[u8]]) -> ClientResult<i64> {
        require_some("HDEL", fields)?;
        self.query(Command::new("HDEL").arg(key).args(fields))
    }

    pub fn hexists(&self, key: &str, field: &[u8]) -> ClientResult<bool> {
        self.query(Command::new("HEXISTS").arg(key).arg(field))
    }

    pub fn hkeys(&self, key: &str) -> ClientResult<Vec<Vec<u8>>> {
        self.query(Command::new("HKEYS").arg(key))
    }

    pub fn hvals(&self, key: &str) -> ClientResult<Vec<Vec<u8>>> {
        self.query(Command::new("HVALS").arg(key))
    }

    /// Flat `field, value, field, value, ...` listing of the hash.
    pub fn hgetall(&self, key: &str) -> ClientResult<Vec<Vec<u8>>> {
        self.query(Command::new("HGETALL").arg(key))
    }

    pub fn hlen(&self, key: &str) -> ClientResult<i64> {
        self.query(Command::new("HLEN").arg(key))
    }
}
