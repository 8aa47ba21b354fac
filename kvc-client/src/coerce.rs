//! # Reply Coercion
//!
//! Purpose: Turn a raw `Reply` into the value an operation promises, keeping
//! "absent", "empty" and "error" apart.
//!
//! ## Rules
//! - `Vec<u8>`: nil becomes empty bytes.
//! - `i64`: nil becomes 0 (count-like); `Option<i64>` keeps nil as `None`.
//! - `bool`: integer 1 is true, every other shape is false.
//! - `Vec<Vec<u8>>`: nil elements become empty entries in place, so positions
//!   still line up with the requested keys or fields.
//! - `()`: any successful reply.
//!
//! Any other shape is a contract violation and surfaces as
//! `ClientError::UnexpectedReply`.

use crate::error::{ClientError, ClientResult};
use crate::resp::Reply;

/// Conversion from a decoded reply into a typed result.
pub trait FromReply: Sized {
    /// Name of the expected shape, reported on mismatch.
    const EXPECTED: &'static str;

    fn from_reply(reply: Reply) -> ClientResult<Self>;
}

fn mismatch<T: FromReply>(reply: &Reply) -> ClientError {
    ClientError::UnexpectedReply {
        expected: T::EXPECTED,
        found: reply.kind(),
    }
}

impl FromReply for Reply {
    const EXPECTED: &'static str = "any";

    fn from_reply(reply: Reply) -> ClientResult<Self> {
        Ok(reply)
    }
}

impl FromReply for () {
    const EXPECTED: &'static str = "status";

    fn from_reply(_reply: Reply) -> ClientResult<Self> {
        Ok(())
    }
}

impl FromReply for Vec<u8> {
    const EXPECTED: &'static str = "bytes or nil";

    fn from_reply(reply: Reply) -> ClientResult<Self> {
        match reply {
            Reply::Nil => Ok(Vec::new()),
            Reply::Bytes(data) => Ok(data),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromReply for Option<Vec<u8>> {
    const EXPECTED: &'static str = "bytes or nil";

    fn from_reply(reply: Reply) -> ClientResult<Self> {
        match reply {
            Reply::Nil => Ok(None),
            Reply::Bytes(data) => Ok(Some(data)),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromReply for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_reply(reply: Reply) -> ClientResult<Self> {
        match reply {
            Reply::Nil => Ok(0),
            Reply::Integer(value) => Ok(value),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromReply for Option<i64> {
    const EXPECTED: &'static str = "integer or nil";

    fn from_reply(reply: Reply) -> ClientResult<Self> {
        match reply {
            Reply::Nil => Ok(None),
            Reply::Integer(value) => Ok(Some(value)),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromReply for bool {
    const EXPECTED: &'static str = "integer";

    fn from_reply(reply: Reply) -> ClientResult<Self> {
        Ok(matches!(reply, Reply::Integer(1)))
    }
}

impl FromReply for Vec<Vec<u8>> {
    const EXPECTED: &'static str = "array of bytes";

    fn from_reply(reply: Reply) -> ClientResult<Self> {
        match reply {
            Reply::Nil => Ok(Vec::new()),
            Reply::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Reply::Nil => Ok(Vec::new()),
                    Reply::Bytes(data) => Ok(data),
                    other => Err(mismatch::<Self>(&other)),
                })
                .collect(),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

/// Array reply with nil entries dropped rather than kept in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Present(pub Vec<Vec<u8>>);

impl FromReply for Present {
    const EXPECTED: &'static str = "array of bytes";

    fn from_reply(reply: Reply) -> ClientResult<Self> {
        match reply {
            Reply::Nil => Ok(Present::default()),
            Reply::Array(items) => {
                let mut present = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Reply::Nil => {}
                        Reply::Bytes(data) => present.push(data),
                        other => return Err(mismatch::<Self>(&other)),
                    }
                }
                Ok(Present(present))
            }
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

/// Sentinel returned by rank lookups when the key or member is absent.
pub const RANK_MISSING: i64 = -1;

/// Maps an optional rank to the `-1` sentinel.
pub fn rank_or_missing(rank: Option<i64>) -> i64 {
    rank.unwrap_or(RANK_MISSING)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(data: &str) -> Reply {
        Reply::Bytes(data.as_bytes().to_vec())
    }

    #[test]
    fn nil_string_is_empty_not_error() {
        assert_eq!(Vec::<u8>::from_reply(Reply::Nil).unwrap(), Vec::<u8>::new());
        assert_eq!(Vec::<u8>::from_reply(bytes("v")).unwrap(), b"v".to_vec());
        assert_eq!(Option::<Vec<u8>>::from_reply(Reply::Nil).unwrap(), None);
    }

    #[test]
    fn string_from_integer_is_contract_violation() {
        let err = Vec::<u8>::from_reply(Reply::Integer(3)).unwrap_err();
        assert!(matches!(
            err,
            ClientError::UnexpectedReply {
                expected: "bytes or nil",
                found: "integer"
            }
        ));
    }

    #[test]
    fn counts_default_to_zero_and_ranks_to_sentinel() {
        assert_eq!(i64::from_reply(Reply::Nil).unwrap(), 0);
        assert_eq!(i64::from_reply(Reply::Integer(7)).unwrap(), 7);
        assert_eq!(rank_or_missing(Option::<i64>::from_reply(Reply::Nil).unwrap()), -1);
        assert_eq!(rank_or_missing(Option::<i64>::from_reply(Reply::Integer(2)).unwrap()), 2);
        assert!(i64::from_reply(bytes("1")).is_err());
    }

    #[test]
    fn boolean_is_true_only_for_one() {
        assert!(bool::from_reply(Reply::Integer(1)).unwrap());
        assert!(!bool::from_reply(Reply::Integer(0)).unwrap());
        assert!(!bool::from_reply(Reply::Integer(2)).unwrap());
        assert!(!bool::from_reply(Reply::Nil).unwrap());
        assert!(!bool::from_reply(bytes("1")).unwrap());
    }

    #[test]
    fn array_keeps_positions_of_missing_entries() {
        let reply = Reply::Array(vec![bytes("1"), Reply::Nil, bytes("3")]);
        let values = Vec::<Vec<u8>>::from_reply(reply).unwrap();
        assert_eq!(values, vec![b"1".to_vec(), Vec::new(), b"3".to_vec()]);
        assert!(Vec::<Vec<u8>>::from_reply(Reply::Nil).unwrap().is_empty());
    }

    #[test]
    fn present_drops_nil_entries() {
        let reply = Reply::Array(vec![bytes(""), Reply::Nil, bytes("k")]);
        let Present(keys) = Present::from_reply(reply).unwrap();
        assert_eq!(keys, vec![Vec::new(), b"k".to_vec()]);
    }

    #[test]
    fn array_with_nested_integer_is_rejected() {
        let reply = Reply::Array(vec![bytes("a"), Reply::Integer(1)]);
        assert!(Vec::<Vec<u8>>::from_reply(reply).is_err());
        assert!(Vec::<Vec<u8>>::from_reply(bytes("a")).is_err());
    }
}
