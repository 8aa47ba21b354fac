//! String and keyspace operations.

use crate::client::CacheClient;
use crate::coerce::Present;
use crate::command::Command;
use crate::error::ClientResult;

impl CacheClient {
    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// `ttl <= 0` leaves the key persistent; `ttl > 0` issues `EXPIRE` after
    /// the write. An error from that second step means the value was written
    /// but its expiration is not guaranteed.
    pub fn set(&self, key: &str, value: &[u8], ttl: i64) -> ClientResult<()> {
        self.write_with_ttl(Command::new("SET").arg(key).arg(value), key, ttl)
    }

    /// Fetches the value of `key`. A missing key yields empty bytes.
    pub fn get(&self, key: &str) -> ClientResult<Vec<u8>> {
        let value: Option<Vec<u8>> = self.query(Command::new("GET").arg(key))?;
        match value {
            Some(data) => Ok(data),
            None => {
                self.logger().debug("kvcache get: no such key", &[("key", &key)]);
                Ok(Vec::new())
            }
        }
    }

    /// Writes every pair with one `MSET`, then applies `ttl` key by key.
    ///
    /// Empty input is a no-op. The first failing `EXPIRE` stops the remaining
    /// ones and is returned; keys before it keep their expiration.
    pub fn mset(&self, pairs: &[(&str, &[u8])], ttl: i64) -> ClientResult<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let mut command = Command::new("MSET");
        for (key, value) in pairs {
            command = command.arg(*key).arg(*value);
        }

        let mut conn = self.acquire()?;
        self.run::<()>(&mut conn, &command)?;
        for (key, _) in pairs {
            self.apply_ttl(&mut conn, key, ttl)?;
        }
        Ok(())
    }

    /// Fetches several keys at once.
    ///
    /// The result has one entry per requested key, in order; missing keys
    /// hold empty bytes at their position.
    pub fn mget(&self, keys: &[&str]) -> ClientResult<Vec<Vec<u8>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.query(Command::new("MGET").args(keys))
    }

    pub fn exists(&self, key: &str) -> ClientResult<bool> {
        self.query(Command::new("EXISTS").arg(key))
    }

    /// Deletes `key`. Deleting an absent key succeeds.
    pub fn del(&self, key: &str) -> ClientResult<()> {
        self.query(Command::new("DEL").arg(key))
    }

    /// Deletes every key in `keys` with a single `DEL`.
    pub fn dels(&self, keys: &[&str]) -> ClientResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let removed: i64 = self.query(Command::new("DEL").args(keys))?;
        self.logger()
            .debug("kvcache dels", &[("requested", &keys.len()), ("removed", &removed)]);
        Ok(())
    }

    /// Lists keys matching a glob `pattern` (`*`, `?`, `[abc]`).
    ///
    /// This runs `KEYS`, which walks the whole keyspace on the store in one
    /// blocking step. Keep it off hot paths and away from large keyspaces.
    pub fn keys(&self, pattern: &str) -> ClientResult<Vec<Vec<u8>>> {
        let Present(keys) = self.query(Command::new("KEYS").arg(pattern))?;
        Ok(keys)
    }
}
