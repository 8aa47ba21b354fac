//! # In-Memory Keyspace
//!
//! Provide typed values (string, set, sorted set, hash, list) keyed by bytes,
//! with lazy TTL expiry checked on access.
//!
//! ## Design Principles
//!
//! 1. **Single Lock**: One `parking_lot::Mutex` guards the whole keyspace; the
//!    store exists to serve tests and small deployments, not to scale.
//! 2. **Typed Values**: A key holds exactly one kind; touching it as another
//!    kind is `StoreError::WrongType`, never a silent conversion.
//! 3. **TTL Fast Path**: Expiration is checked on access, no background sweep.
//! 4. **No Empty Containers**: Removing the last member removes the key.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Errors raised by keyspace operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The key holds a different kind of value.
    WrongType,
    /// The expiration lies beyond what the clock can represent.
    InvalidExpire,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Value stored under one key.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(Vec<u8>),
    Set(HashSet<Vec<u8>>),
    ZSet(HashMap<Vec<u8>, f64>),
    Hash(HashMap<Vec<u8>, Vec<u8>>),
    List(VecDeque<Vec<u8>>),
}

impl Value {
    fn is_empty_container(&self) -> bool {
        match self {
            Value::Str(_) => false,
            Value::Set(set) => set.is_empty(),
            Value::ZSet(zset) => zset.is_empty(),
            Value::Hash(hash) => hash.is_empty(),
            Value::List(list) => list.is_empty(),
        }
    }
}

#[derive(Debug)]
struct Entry {
    value: Value,
    // Absolute expiration timestamp.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}

/// TTL state of a key, mirroring the `TTL` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlStatus {
    Missing,
    NoExpiry,
    ExpiresIn(Duration),
}

/// One end of a score range: `1.5`, `(1.5`, `-inf`, `+inf`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreLimit {
    pub value: f64,
    pub exclusive: bool,
}

impl ScoreLimit {
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(raw).ok()?;
        let (exclusive, number) = match text.strip_prefix('(') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let value = match number.to_ascii_lowercase().as_str() {
            "-inf" => f64::NEG_INFINITY,
            "+inf" | "inf" => f64::INFINITY,
            other => other.parse::<f64>().ok().filter(|v| !v.is_nan())?,
        };
        Some(ScoreLimit { value, exclusive })
    }

    fn admits_from_below(&self, score: f64) -> bool {
        if self.exclusive {
            score > self.value
        } else {
            score >= self.value
        }
    }

    fn admits_from_above(&self, score: f64) -> bool {
        if self.exclusive {
            score < self.value
        } else {
            score <= self.value
        }
    }
}

// Generates typed read / write / existing-mut accessors for one value kind.
macro_rules! typed_access {
    ($read:ident, $write:ident, $existing:ident, $variant:ident, $ty:ty) => {
        fn $read(&mut self, key: &[u8]) -> StoreResult<Option<&$ty>> {
            match self.value(key) {
                None => Ok(None),
                Some(Value::$variant(inner)) => Ok(Some(inner)),
                Some(_) => Err(StoreError::WrongType),
            }
        }

        fn $write(&mut self, key: &[u8]) -> StoreResult<&mut $ty> {
            match self.value_or_insert(key, || Value::$variant(Default::default())) {
                Value::$variant(inner) => Ok(inner),
                _ => Err(StoreError::WrongType),
            }
        }

        fn $existing(&mut self, key: &[u8]) -> StoreResult<Option<&mut $ty>> {
            match self.value_mut(key) {
                None => Ok(None),
                Some(Value::$variant(inner)) => Ok(Some(inner)),
                Some(_) => Err(StoreError::WrongType),
            }
        }
    };
}

/// The keyspace itself. Callers reach it through [`Store::with`].
#[derive(Debug, Default)]
pub struct Keyspace {
    entries: HashMap<Vec<u8>, Entry>,
}

impl Keyspace {
    typed_access!(set_ref, set_mut, set_existing, Set, HashSet<Vec<u8>>);
    typed_access!(zset_ref, zset_mut, zset_existing, ZSet, HashMap<Vec<u8>, f64>);
    typed_access!(hash_ref, hash_mut, hash_existing, Hash, HashMap<Vec<u8>, Vec<u8>>);
    typed_access!(list_ref, list_mut, list_existing, List, VecDeque<Vec<u8>>);

    fn purge_expired(&mut self, key: &[u8]) {
        let now = Instant::now();
        if self.entries.get(key).map_or(false, |entry| entry.is_expired(now)) {
            self.entries.remove(key);
        }
    }

    fn value(&mut self, key: &[u8]) -> Option<&Value> {
        self.purge_expired(key);
        self.entries.get(key).map(|entry| &entry.value)
    }

    fn value_mut(&mut self, key: &[u8]) -> Option<&mut Value> {
        self.purge_expired(key);
        self.entries.get_mut(key).map(|entry| &mut entry.value)
    }

    fn value_or_insert(&mut self, key: &[u8], init: impl FnOnce() -> Value) -> &mut Value {
        self.purge_expired(key);
        &mut self
            .entries
            .entry(key.to_vec())
            .or_insert_with(|| Entry {
                value: init(),
                expires_at: None,
            })
            .value
    }

    fn drop_if_empty(&mut self, key: &[u8]) {
        if self.entries.get(key).map_or(false, |entry| entry.value.is_empty_container()) {
            self.entries.remove(key);
        }
    }

    // ---- keyspace ----

    pub fn exists(&mut self, key: &[u8]) -> bool {
        self.value(key).is_some()
    }

    pub fn delete(&mut self, key: &[u8]) -> bool {
        self.purge_expired(key);
        self.entries.remove(key).is_some()
    }

    /// Keys matching a glob pattern, in no particular order.
    pub fn keys(&mut self, pattern: &[u8]) -> Vec<Vec<u8>> {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        self.entries
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect()
    }

    /// Sets a relative expiration. Non-positive `seconds` deletes the key.
    pub fn expire(&mut self, key: &[u8], seconds: i64) -> StoreResult<bool> {
        self.purge_expired(key);
        if seconds <= 0 {
            return Ok(self.entries.remove(key).is_some());
        }
        let deadline = deadline_after(seconds)?;
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(deadline);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn ttl(&mut self, key: &[u8]) -> TtlStatus {
        self.purge_expired(key);
        match self.entries.get(key) {
            None => TtlStatus::Missing,
            Some(Entry { expires_at: None, .. }) => TtlStatus::NoExpiry,
            Some(Entry {
                expires_at: Some(deadline),
                ..
            }) => TtlStatus::ExpiresIn(deadline.saturating_duration_since(Instant::now())),
        }
    }

    // ---- strings ----

    pub fn get(&mut self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        match self.value(key) {
            None => Ok(None),
            Some(Value::Str(data)) => Ok(Some(data.clone())),
            Some(_) => Err(StoreError::WrongType),
        }
    }

    /// Overwrites any previous value and clears its expiration.
    pub fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.entries.insert(
            key.to_vec(),
            Entry {
                value: Value::Str(value),
                expires_at: None,
            },
        );
    }

    /// `SET key value EX seconds`: nothing is written when `seconds` is out of range.
    pub fn set_with_expiry(&mut self, key: &[u8], value: Vec<u8>, seconds: i64) -> StoreResult<()> {
        let deadline = deadline_after(seconds)?;
        self.entries.insert(
            key.to_vec(),
            Entry {
                value: Value::Str(value),
                expires_at: Some(deadline),
            },
        );
        Ok(())
    }

    // ---- sets ----

    pub fn sadd(&mut self, key: &[u8], members: &[Vec<u8>]) -> StoreResult<i64> {
        let set = self.set_mut(key)?;
        Ok(members.iter().filter(|m| set.insert((*m).clone())).count() as i64)
    }

    pub fn srem(&mut self, key: &[u8], members: &[Vec<u8>]) -> StoreResult<i64> {
        let removed = match self.set_existing(key)? {
            Some(set) => members.iter().filter(|m| set.remove(*m)).count() as i64,
            None => 0,
        };
        self.drop_if_empty(key);
        Ok(removed)
    }

    pub fn scard(&mut self, key: &[u8]) -> StoreResult<i64> {
        Ok(self.set_ref(key)?.map_or(0, |set| set.len() as i64))
    }

    pub fn sismember(&mut self, key: &[u8], member: &[u8]) -> StoreResult<bool> {
        Ok(self.set_ref(key)?.map_or(false, |set| set.contains(member)))
    }

    pub fn smembers(&mut self, key: &[u8]) -> StoreResult<Vec<Vec<u8>>> {
        Ok(self
            .set_ref(key)?
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    // ---- sorted sets ----

    /// Adds or rescores members; returns how many were new.
    pub fn zadd(&mut self, key: &[u8], pairs: Vec<(f64, Vec<u8>)>) -> StoreResult<i64> {
        let zset = self.zset_mut(key)?;
        let mut added = 0;
        for (score, member) in pairs {
            if zset.insert(member, score).is_none() {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn zrem(&mut self, key: &[u8], members: &[Vec<u8>]) -> StoreResult<i64> {
        let removed = match self.zset_existing(key)? {
            Some(zset) => members.iter().filter(|m| zset.remove(*m).is_some()).count() as i64,
            None => 0,
        };
        self.drop_if_empty(key);
        Ok(removed)
    }

    pub fn zcard(&mut self, key: &[u8]) -> StoreResult<i64> {
        Ok(self.zset_ref(key)?.map_or(0, |zset| zset.len() as i64))
    }

    pub fn zrank(&mut self, key: &[u8], member: &[u8], reverse: bool) -> StoreResult<Option<i64>> {
        let Some(zset) = self.zset_ref(key)? else {
            return Ok(None);
        };
        let mut ordered = sorted(zset);
        if reverse {
            ordered.reverse();
        }
        Ok(ordered
            .iter()
            .position(|(m, _)| m.as_slice() == member)
            .map(|idx| idx as i64))
    }

    /// Members between ranks `start` and `stop`, inclusive, negative from the end.
    pub fn zrange(
        &mut self,
        key: &[u8],
        start: i64,
        stop: i64,
        reverse: bool,
    ) -> StoreResult<Vec<(Vec<u8>, f64)>> {
        let Some(zset) = self.zset_ref(key)? else {
            return Ok(Vec::new());
        };
        let mut ordered = sorted(zset);
        if reverse {
            ordered.reverse();
        }
        Ok(match rank_window(ordered.len(), start, stop) {
            Some((from, to)) => ordered.drain(from..=to).collect(),
            None => Vec::new(),
        })
    }

    pub fn zrange_by_score(
        &mut self,
        key: &[u8],
        min: ScoreLimit,
        max: ScoreLimit,
    ) -> StoreResult<Vec<(Vec<u8>, f64)>> {
        let Some(zset) = self.zset_ref(key)? else {
            return Ok(Vec::new());
        };
        Ok(sorted(zset)
            .into_iter()
            .filter(|(_, score)| min.admits_from_below(*score) && max.admits_from_above(*score))
            .collect())
    }

    pub fn zrem_range_by_score(&mut self, key: &[u8], min: ScoreLimit, max: ScoreLimit) -> StoreResult<i64> {
        let removed = match self.zset_existing(key)? {
            Some(zset) => {
                let before = zset.len();
                zset.retain(|_, score| !(min.admits_from_below(*score) && max.admits_from_above(*score)));
                (before - zset.len()) as i64
            }
            None => 0,
        };
        self.drop_if_empty(key);
        Ok(removed)
    }

    // ---- hashes ----

    /// Sets fields; returns how many were new.
    pub fn hset(&mut self, key: &[u8], pairs: Vec<(Vec<u8>, Vec<u8>)>) -> StoreResult<i64> {
        let hash = self.hash_mut(key)?;
        let mut added = 0;
        for (field, value) in pairs {
            if hash.insert(field, value).is_none() {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn hget(&mut self, key: &[u8], field: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.hash_ref(key)?.and_then(|hash| hash.get(field).cloned()))
    }

    pub fn hmget(&mut self, key: &[u8], fields: &[Vec<u8>]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        let hash = self.hash_ref(key)?;
        Ok(fields
            .iter()
            .map(|field| hash.and_then(|hash| hash.get(field).cloned()))
            .collect())
    }

    pub fn hdel(&mut self, key: &[u8], fields: &[Vec<u8>]) -> StoreResult<i64> {
        let removed = match self.hash_existing(key)? {
            Some(hash) => fields.iter().filter(|f| hash.remove(*f).is_some()).count() as i64,
            None => 0,
        };
        self.drop_if_empty(key);
        Ok(removed)
    }

    pub fn hexists(&mut self, key: &[u8], field: &[u8]) -> StoreResult<bool> {
        Ok(self.hash_ref(key)?.map_or(false, |hash| hash.contains_key(field)))
    }

    pub fn hgetall(&mut self, key: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .hash_ref(key)?
            .map(|hash| hash.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    pub fn hlen(&mut self, key: &[u8]) -> StoreResult<i64> {
        Ok(self.hash_ref(key)?.map_or(0, |hash| hash.len() as i64))
    }

    // ---- lists ----

    /// Pushes values one by one to the head (`front`) or tail; returns the new length.
    pub fn push(&mut self, key: &[u8], values: Vec<Vec<u8>>, front: bool) -> StoreResult<i64> {
        let list = self.list_mut(key)?;
        for value in values {
            if front {
                list.push_front(value);
            } else {
                list.push_back(value);
            }
        }
        Ok(list.len() as i64)
    }

    pub fn pop(&mut self, key: &[u8], front: bool) -> StoreResult<Option<Vec<u8>>> {
        let popped = match self.list_existing(key)? {
            Some(list) if front => list.pop_front(),
            Some(list) => list.pop_back(),
            None => None,
        };
        self.drop_if_empty(key);
        Ok(popped)
    }

    pub fn lindex(&mut self, key: &[u8], index: i64) -> StoreResult<Option<Vec<u8>>> {
        let Some(list) = self.list_ref(key)? else {
            return Ok(None);
        };
        let len = list.len() as i64;
        let idx = if index < 0 { len + index } else { index };
        if idx < 0 || idx >= len {
            return Ok(None);
        }
        Ok(list.get(idx as usize).cloned())
    }

    pub fn llen(&mut self, key: &[u8]) -> StoreResult<i64> {
        Ok(self.list_ref(key)?.map_or(0, |list| list.len() as i64))
    }
}

fn deadline_after(seconds: i64) -> StoreResult<Instant> {
    let seconds = u64::try_from(seconds).map_err(|_| StoreError::InvalidExpire)?;
    Instant::now()
        .checked_add(Duration::from_secs(seconds))
        .ok_or(StoreError::InvalidExpire)
}

/// Sorted-set members ordered by score, ties broken by member bytes.
fn sorted(zset: &HashMap<Vec<u8>, f64>) -> Vec<(Vec<u8>, f64)> {
    let mut ordered: Vec<(Vec<u8>, f64)> = zset.iter().map(|(m, s)| (m.clone(), *s)).collect();
    ordered.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    ordered
}

/// Resolves inclusive rank bounds against `len`; `None` when the window is empty.
fn rank_window(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

/// Glob matching as used by `KEYS`: `*`, `?`, `[abc]`, `[^a-z]`, `\x`.
///
/// Runs in `O(pattern * text)`: on a mismatch only the most recent `*` is
/// widened, never earlier ones.
pub fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Pattern index after the last `*`, and the text index it resumes from.
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        if let Some(next) = match_one(pattern, p, text[t]) {
            p = next;
            t += 1;
        } else if pattern.get(p) == Some(&b'*') {
            p += 1;
            star = Some((p, t));
        } else if let Some((resume, from)) = star {
            p = resume;
            t = from + 1;
            star = Some((resume, t));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&b| b == b'*')
}

// Matches one text byte at pattern index `p`; returns the next pattern index.
// `*` never matches here, the caller handles it.
fn match_one(pattern: &[u8], p: usize, ch: u8) -> Option<usize> {
    match *pattern.get(p)? {
        b'*' => None,
        b'?' => Some(p + 1),
        b'[' => match match_class(&pattern[p + 1..], ch) {
            Some((true, after)) => Some(pattern.len() - after.len()),
            Some((false, _)) => None,
            // Unterminated class: treat `[` literally.
            None => (ch == b'[').then_some(p + 1),
        },
        b'\\' if p + 1 < pattern.len() => (pattern[p + 1] == ch).then_some(p + 2),
        literal => (literal == ch).then_some(p + 1),
    }
}

// Matches `ch` against a class body that follows `[`; returns the outcome and
// the pattern after the closing `]`.
fn match_class(class: &[u8], ch: u8) -> Option<(bool, &[u8])> {
    let (negate, mut idx) = match class.first() {
        Some(b'^') => (true, 1),
        _ => (false, 0),
    };
    let mut matched = false;
    while idx < class.len() {
        match class[idx] {
            b']' => return Some((matched != negate, &class[idx + 1..])),
            b'\\' if idx + 1 < class.len() => {
                matched |= class[idx + 1] == ch;
                idx += 2;
            }
            low if idx + 2 < class.len() && class[idx + 1] == b'-' && class[idx + 2] != b']' => {
                let high = class[idx + 2];
                let (low, high) = if low <= high { (low, high) } else { (high, low) };
                matched |= (low..=high).contains(&ch);
                idx += 3;
            }
            single => {
                matched |= single == ch;
                idx += 1;
            }
        }
    }
    None
}

/// Shared, thread-safe handle to a keyspace.
#[derive(Debug, Default)]
pub struct Store {
    keyspace: Mutex<Keyspace>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with exclusive access to the keyspace.
    pub fn with<R>(&self, f: impl FnOnce(&mut Keyspace) -> R) -> R {
        let mut keyspace = self.keyspace.lock();
        f(&mut keyspace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(items: &[&str]) -> Vec<Vec<u8>> {
        items.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn set_clears_previous_expiration() {
        let mut ks = Keyspace::default();
        ks.set(b"k", b"v1".to_vec());
        assert_eq!(ks.expire(b"k", 100), Ok(true));
        assert!(matches!(ks.ttl(b"k"), TtlStatus::ExpiresIn(_)));
        ks.set(b"k", b"v2".to_vec());
        assert_eq!(ks.ttl(b"k"), TtlStatus::NoExpiry);
        assert_eq!(ks.ttl(b"nope"), TtlStatus::Missing);
    }

    #[test]
    fn expired_keys_disappear_on_access() {
        let mut ks = Keyspace::default();
        ks.set(b"k", b"v".to_vec());
        ks.entries.get_mut(b"k".as_slice()).unwrap().expires_at = Some(Instant::now());
        assert_eq!(ks.get(b"k"), Ok(None));
        assert!(!ks.exists(b"k"));
    }

    #[test]
    fn non_positive_expire_deletes() {
        let mut ks = Keyspace::default();
        ks.set(b"k", b"v".to_vec());
        assert_eq!(ks.expire(b"k", 0), Ok(true));
        assert!(!ks.exists(b"k"));
        assert_eq!(ks.expire(b"k", 10), Ok(false));
    }

    #[test]
    fn unrepresentable_expiration_is_rejected() {
        let mut ks = Keyspace::default();
        ks.set(b"k", b"v".to_vec());
        assert_eq!(ks.expire(b"k", i64::MAX), Err(StoreError::InvalidExpire));
        assert_eq!(ks.ttl(b"k"), TtlStatus::NoExpiry);
        assert_eq!(
            ks.set_with_expiry(b"fresh", b"v".to_vec(), i64::MAX),
            Err(StoreError::InvalidExpire)
        );
        assert!(!ks.exists(b"fresh"));
        assert_eq!(ks.set_with_expiry(b"fresh", b"v".to_vec(), 30), Ok(()));
        assert!(matches!(ks.ttl(b"fresh"), TtlStatus::ExpiresIn(_)));
    }

    #[test]
    fn wrong_type_is_reported() {
        let mut ks = Keyspace::default();
        ks.set(b"k", b"v".to_vec());
        assert_eq!(ks.sadd(b"k", &bytes(&["x"])), Err(StoreError::WrongType));
        assert_eq!(ks.llen(b"k"), Err(StoreError::WrongType));
        ks.sadd(b"s", &bytes(&["x"])).unwrap();
        assert_eq!(ks.get(b"s"), Err(StoreError::WrongType));
    }

    #[test]
    fn duplicate_set_members_count_once() {
        let mut ks = Keyspace::default();
        assert_eq!(ks.sadd(b"s", &bytes(&["x", "x"])), Ok(1));
        assert_eq!(ks.sadd(b"s", &bytes(&["x"])), Ok(0));
        assert_eq!(ks.scard(b"s"), Ok(1));
        assert_eq!(ks.srem(b"s", &bytes(&["x"])), Ok(1));
        assert!(!ks.exists(b"s"));
    }

    #[test]
    fn sorted_set_orders_by_score_then_member() {
        let mut ks = Keyspace::default();
        ks.zadd(
            b"z",
            vec![(200.0, b"m1".to_vec()), (100.0, b"m2".to_vec()), (100.0, b"a".to_vec())],
        )
        .unwrap();
        let members: Vec<Vec<u8>> = ks.zrange(b"z", 0, -1, false).unwrap().into_iter().map(|(m, _)| m).collect();
        assert_eq!(members, bytes(&["a", "m2", "m1"]));
        assert_eq!(ks.zrank(b"z", b"m1", false), Ok(Some(2)));
        assert_eq!(ks.zrank(b"z", b"m1", true), Ok(Some(0)));
        assert_eq!(ks.zrank(b"z", b"zz", false), Ok(None));
        assert_eq!(ks.zrank(b"missing", b"m1", false), Ok(None));
    }

    #[test]
    fn rank_window_follows_store_rules() {
        assert_eq!(rank_window(3, 0, -1), Some((0, 2)));
        assert_eq!(rank_window(3, -2, -1), Some((1, 2)));
        assert_eq!(rank_window(3, 1, 100), Some((1, 2)));
        assert_eq!(rank_window(3, -100, 0), Some((0, 0)));
        assert_eq!(rank_window(3, 2, 1), None);
        assert_eq!(rank_window(3, 5, 10), None);
        assert_eq!(rank_window(0, 0, -1), None);
    }

    #[test]
    fn score_limits_parse_and_filter() {
        let mut ks = Keyspace::default();
        ks.zadd(b"z", vec![(1.0, b"a".to_vec()), (2.0, b"b".to_vec()), (3.0, b"c".to_vec())])
            .unwrap();
        let min = ScoreLimit::parse(b"(1").unwrap();
        let max = ScoreLimit::parse(b"+inf").unwrap();
        let hits = ks.zrange_by_score(b"z", min, max).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(ScoreLimit::parse(b"abc").is_none());
        assert!(ScoreLimit::parse(b"nan").is_none());

        let all_low = ScoreLimit::parse(b"-inf").unwrap();
        let two = ScoreLimit::parse(b"2").unwrap();
        assert_eq!(ks.zrem_range_by_score(b"z", all_low, two), Ok(2));
        assert_eq!(ks.zcard(b"z"), Ok(1));
    }

    #[test]
    fn hash_fields_keep_request_positions() {
        let mut ks = Keyspace::default();
        ks.hset(b"h", vec![(b"f1".to_vec(), b"v1".to_vec())]).unwrap();
        let values = ks.hmget(b"h", &bytes(&["f1", "nope"])).unwrap();
        assert_eq!(values, vec![Some(b"v1".to_vec()), None]);
        assert_eq!(ks.hmget(b"missing", &bytes(&["f1"])).unwrap(), vec![None]);
        assert_eq!(ks.hdel(b"h", &bytes(&["f1", "nope"])), Ok(1));
        assert_eq!(ks.hlen(b"h"), Ok(0));
    }

    #[test]
    fn list_push_pop_and_index() {
        let mut ks = Keyspace::default();
        assert_eq!(ks.push(b"l", bytes(&["a", "b"]), false), Ok(2));
        assert_eq!(ks.push(b"l", bytes(&["z"]), true), Ok(3));
        assert_eq!(ks.lindex(b"l", 0), Ok(Some(b"z".to_vec())));
        assert_eq!(ks.lindex(b"l", -1), Ok(Some(b"b".to_vec())));
        assert_eq!(ks.lindex(b"l", 10), Ok(None));
        assert_eq!(ks.pop(b"l", false), Ok(Some(b"b".to_vec())));
        assert_eq!(ks.pop(b"l", true), Ok(Some(b"z".to_vec())));
        assert_eq!(ks.pop(b"l", true), Ok(Some(b"a".to_vec())));
        assert_eq!(ks.pop(b"l", true), Ok(None));
        assert!(!ks.exists(b"l"));
    }

    #[test]
    fn glob_patterns() {
        assert!(glob_match(b"*", b""));
        assert!(glob_match(b"user:*", b"user:42"));
        assert!(!glob_match(b"user:*", b"session:1"));
        assert!(glob_match(b"h?llo", b"hello"));
        assert!(!glob_match(b"h?llo", b"hllo"));
        assert!(glob_match(b"h[ae]llo", b"hallo"));
        assert!(!glob_match(b"h[^e]llo", b"hello"));
        assert!(glob_match(b"h[a-c]llo", b"hbllo"));
        assert!(glob_match(b"a\\*b", b"a*b"));
        assert!(!glob_match(b"a\\*b", b"axb"));
        assert!(glob_match(b"*[", b"x["));
        assert!(glob_match(b"**a", b"bba"));
        assert!(!glob_match(b"a*", b""));
    }

    #[test]
    fn many_stars_stay_linear() {
        let text = vec![b'a'; 20_000];
        assert!(!glob_match(b"*a*a*a*a*a*a*a*a*b", &text));
        assert!(glob_match(b"*a*a*a*a*a*a*a*a*", &text));
    }

    #[test]
    fn keys_skips_expired_entries() {
        let mut ks = Keyspace::default();
        ks.set(b"user:1", b"a".to_vec());
        ks.set(b"user:2", b"b".to_vec());
        ks.entries.get_mut(b"user:2".as_slice()).unwrap().expires_at = Some(Instant::now());
        assert_eq!(ks.keys(b"user:*"), bytes(&["user:1"]));
    }
}
