//! List operations. `lr*` works on the right (tail) end, `ll*` on the left.

use crate::client::{require_some, CacheClient};
use crate::command::Command;
use crate::error::ClientResult;

impl CacheClient {
    /// Appends `values` to the tail; returns the new length.
    pub fn lrpush(&self, key: &str, values: &[&[u8]]) -> ClientResult<i64> {
        require_some("RPUSH", values)?;
        self.query(Command::new("RPUSH").arg(key).args(values))
    }

    /// Prepends `values` to the head; returns the new length.
    pub fn llpush(&self, key: &str, values: &[&[u8]]) -> ClientResult<i64> {
        require_some("LPUSH", values)?;
        self.query(Command::new("LPUSH").arg(key).args(values))
    }

    /// Removes and returns the tail element; empty bytes for an empty list.
    pub fn lrpop(&self, key: &str) -> ClientResult<Vec<u8>> {
        self.pop("RPOP", key)
    }

    /// Removes and returns the head element; empty bytes for an empty list.
    pub fn llpop(&self, key: &str) -> ClientResult<Vec<u8>> {
        self.pop("LPOP", key)
    }

    /// Element at `index` (negative counts from the tail); empty bytes when
    /// the key is missing or the index is out of range.
    pub fn lindex(&self, key: &str, index: i64) -> ClientResult<Vec<u8>> {
        let value: Option<Vec<u8>> = self.query(Command::new("LINDEX").arg(key).arg(&index))?;
        match value {
            Some(data) => Ok(data),
            None => {
                self.logger()
                    .debug("kvcache lindex: no such element", &[("key", &key), ("index", &index)]);
                Ok(Vec::new())
            }
        }
    }

    pub fn lllen(&self, key: &str) -> ClientResult<i64> {
        self.query(Command::new("LLEN").arg(key))
    }

    fn pop(&self, name: &'static str, key: &str) -> ClientResult<Vec<u8>> {
        let value: Option<Vec<u8>> = self.query(Command::new(name).arg(key))?;
        match value {
            Some(data) => Ok(data),
            None => {
                self.logger()
                    .debug("kvcache pop: list empty", &[("command", &name), ("key", &key)]);
                Ok(Vec::new())
            }
        }
    }
}
