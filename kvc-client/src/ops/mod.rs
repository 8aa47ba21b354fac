//! Operation groups of the cache client, one module per data shape.
//!
//! Every module adds an `impl CacheClient` block; shared plumbing lives in
//! `crate::client`.

mod hash;
mod list;
mod set;
mod string;
mod zset;

pub use zset::ScoreBound;
