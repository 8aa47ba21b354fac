//! Sorted-set operations.

use std::fmt;

use crate::client::{require_pairs, require_some, CacheClient};
use crate::coerce::rank_or_missing;
use crate::command::{Command, ToArg};
use crate::error::ClientResult;

/// One end of a score range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    /// Scores equal to the value are included.
    Inclusive(f64),
    /// Scores equal to the value are excluded, written as `(value`.
    Exclusive(f64),
    NegInf,
    PosInf,
}

impl fmt::Display for ScoreBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreBound::Inclusive(score) => write!(f, "{}", score),
            ScoreBound::Exclusive(score) => write!(f, "({}", score),
            ScoreBound::NegInf => f.write_str("-inf"),
            ScoreBound::PosInf => f.write_str("+inf"),
        }
    }
}

impl From<f64> for ScoreBound {
    fn from(score: f64) -> Self {
        ScoreBound::Inclusive(score)
    }
}

impl From<i64> for ScoreBound {
    fn from(score: i64) -> Self {
        ScoreBound::Inclusive(score as f64)
    }
}

impl ToArg for ScoreBound {
    fn write_arg(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.to_string().as_bytes());
    }
}

impl CacheClient {
    /// Adds scored members: `args` is `score, member, score, member, ...`.
    ///
    /// An odd-length or empty `args` is rejected before any network call.
    pub fn zadd(&self, key: &str, ttl: i64, args: &[&[u8]]) -> ClientResult<()> {
        require_pairs("ZADD", args)?;
        self.write_with_ttl(Command::new("ZADD").arg(key).args(args), key, ttl)
    }

    pub fn zrem(&self, key: &str, members: &[&[u8]]) -> ClientResult<i64> {
        require_some("ZREM", members)?;
        self.query(Command::new("ZREM").arg(key).args(members))
    }

    pub fn zcard(&self, key: &str) -> ClientResult<i64> {
        self.query(Command::new("ZCARD").arg(key))
    }

    /// Zero-based ascending rank of `member`, or `-1` when the key or the
    /// member is absent. The two cases are indistinguishable.
    pub fn zrank(&self, key: &str, member: &[u8]) -> ClientResult<i64> {
        let rank = self.query(Command::new("ZRANK").arg(key).arg(member))?;
        Ok(rank_or_missing(rank))
    }

    /// Descending counterpart of [`CacheClient::zrank`].
    pub fn zrevrank(&self, key: &str, member: &[u8]) -> ClientResult<i64> {
        let rank = self.query(Command::new("ZREVRANK").arg(key).arg(member))?;
        Ok(rank_or_missing(rank))
    }

    /// Members between ranks `start` and `stop` (inclusive, negative counts
    /// from the end) in ascending score order. With `with_scores`, each
    /// member is followed by its score.
    pub fn zrange(&self, key: &str, start: i64, stop: i64, with_scores: bool) -> ClientResult<Vec<Vec<u8>>> {
        self.query(range_command("ZRANGE", key, start, stop, with_scores))
    }

    pub fn zrevrange(&self, key: &str, start: i64, stop: i64, with_scores: bool) -> ClientResult<Vec<Vec<u8>>> {
        self.query(range_command("ZREVRANGE", key, start, stop, with_scores))
    }

    /// Members with scores inside `[min, max]` in ascending order.
    pub fn zrange_by_score(
        &self,
        key: &str,
        min: impl Into<ScoreBound>,
        max: impl Into<ScoreBound>,
        with_scores: bool,
    ) -> ClientResult<Vec<Vec<u8>>> {
        let mut command = Command::new("ZRANGEBYSCORE")
            .arg(key)
            .arg(&min.into())
            .arg(&max.into());
        if with_scores {
            command = command.arg("WITHSCORES");
        }
        self.query(command)
    }

    /// Removes members with scores inside `[min, max]`; returns the count.
    pub fn zrem_range_by_score(
        &self,
        key: &str,
        min: impl Into<ScoreBound>,
        max: impl Into<ScoreBound>,
    ) -> ClientResult<i64> {
        self.query(
            Command::new("ZREMRANGEBYSCORE")
                .arg(key)
                .arg(&min.into())
                .arg(&max.into()),
        )
    }
}

fn range_command(name: &'static str, key: &str, start: i64, stop: i64, with_scores: bool) -> Command {
    let command = Command::new(name).arg(key).arg(&start).arg(&stop);
    if with_scores {
        command.arg("WITHSCORES")
    } else {
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_bounds_render_like_the_store_expects() {
        assert_eq!(ScoreBound::from(100i64).to_string(), "100");
        assert_eq!(ScoreBound::Inclusive(1.5).to_string(), "1.5");
        assert_eq!(ScoreBound::Exclusive(2.0).to_string(), "(2");
        assert_eq!(ScoreBound::NegInf.to_string(), "-inf");
        assert_eq!(ScoreBound::PosInf.to_string(), "+inf");
    }

    #[test]
    fn range_command_appends_withscores() {
        let plain = range_command("ZRANGE", "z", 0, -1, false);
        assert_eq!(plain.arg_list().len(), 3);
        let scored = range_command("ZRANGE", "z", 0, -1, true);
        assert_eq!(scored.arg_list()[3], b"WITHSCORES".to_vec());
        assert_eq!(scored.arg_list()[2], b"-1".to_vec());
    }
}
