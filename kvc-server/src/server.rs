//! # TCP Server
//!
//! Accept RESP2 connections, parse commands, and dispatch them to the
//! in-memory keyspace.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::protocol::{
    resp_array, resp_bulk, resp_coded_error, resp_error, resp_integer, resp_null, resp_nullable_array,
    resp_optional, resp_simple, RespError, RespParser,
};
use crate::store::{Keyspace, ScoreLimit, Store, StoreError, StoreResult, TtlStatus};

/// Per-connection state.
#[derive(Debug)]
struct Session {
    password: Option<Arc<str>>,
    authenticated: bool,
}

impl Session {
    fn new(password: Option<Arc<str>>) -> Self {
        let authenticated = password.is_none();
        Self {
            password,
            authenticated,
        }
    }
}

/// Accepts connections until `shutdown` flips to `true`.
pub async fn serve(
    listener: TcpListener,
    store: Arc<Store>,
    password: Option<Arc<str>>,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                let store = Arc::clone(&store);
                let password = password.clone();
                tokio::spawn(async move {
                    tracing::debug!(%peer, "connection accepted");
                    if let Err(err) = handle_connection(stream, store, password).await {
                        tracing::debug!(%peer, error = %err, "connection closed with error");
                    }
                });
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    tracing::info!("server shutting down");
                    return Ok(());
                }
            }
        }
    }
}

/// Handles a single TCP client connection.
pub async fn handle_connection(
    mut stream: TcpStream,
    store: Arc<Store>,
    password: Option<Arc<str>>,
) -> std::io::Result<()> {
    let mut buffer = BytesMut::with_capacity(8 * 1024);
    let mut parser = RespParser::new();
    let mut session = Session::new(password);

    loop {
        let bytes = stream.read_buf(&mut buffer).await?;
        if bytes == 0 {
            break;
        }

        loop {
            match parser.parse(&mut buffer) {
                Ok(Some(args)) => {
                    let response = dispatch_command(&args, &store, &mut session);
                    stream.write_all(&response).await?;
                }
                Ok(None) => break,
                Err(RespError::Protocol(reason)) => {
                    tracing::warn!(reason, "protocol error, closing connection");
                    stream.write_all(&resp_error(&format!("Protocol error: {}", reason))).await?;
                    return Ok(());
                }
            }
        }
    }

    Ok(())
}

fn dispatch_command(args: &[Vec<u8>], store: &Store, session: &mut Session) -> Vec<u8> {
    let Some(name) = args.first() else {
        return resp_error("empty command");
    };
    let name = name.to_ascii_uppercase();

    if name.as_slice() == b"AUTH" {
        return handle_auth(args, session);
    }
    if !session.authenticated {
        return resp_coded_error("NOAUTH", "Authentication required.");
    }

    let Some(expected) = arity(&name) else {
        let shown = String::from_utf8_lossy(&name).to_lowercase();
        return resp_error(&format!("unknown command '{}'", shown));
    };
    if !expected.admits(args.len()) {
        let shown = String::from_utf8_lossy(&name).to_lowercase();
        return resp_error(&format!("wrong number of arguments for '{}' command", shown));
    }

    let outcome = store.with(|ks| execute(&name, args, ks));
    match outcome {
        Ok(reply) => reply,
        Err(StoreError::WrongType) => resp_coded_error(
            "WRONGTYPE",
            "Operation against a key holding the wrong kind of value",
        ),
        Err(StoreError::InvalidExpire) => {
            let shown = String::from_utf8_lossy(&name).to_lowercase();
            resp_error(&format!("invalid expire time in '{}' command", shown))
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Arity {
    Exact(usize),
    AtLeast(usize),
    // At least `min` with `min + k * step` total arguments.
    Pairs { min: usize, step: usize },
}

impl Arity {
    fn admits(self, len: usize) -> bool {
        match self {
            Arity::Exact(n) => len == n,
            Arity::AtLeast(n) => len >= n,
            Arity::Pairs { min, step } => len >= min && (len - min) % step == 0,
        }
    }
}

fn arity(name: &[u8]) -> Option<Arity> {
    let arity = match name {
        b"PING" => Arity::AtLeast(1),
        b"GET" | b"EXISTS" | b"TTL" | b"SCARD" | b"SMEMBERS" | b"ZCARD" | b"HKEYS" | b"HVALS"
        | b"HGETALL" | b"HLEN" | b"LPOP" | b"RPOP" | b"LLEN" | b"KEYS" => Arity::Exact(2),
        b"SET" => Arity::AtLeast(3),
        b"EXPIRE" | b"SISMEMBER" | b"ZRANK" | b"ZREVRANK" | b"HGET" | b"HEXISTS" | b"LINDEX" => {
            Arity::Exact(3)
        }
        b"DEL" | b"MGET" => Arity::AtLeast(2),
        b"MSET" => Arity::Pairs { min: 3, step: 2 },
        b"SADD" | b"SREM" | b"ZREM" | b"HMGET" | b"HDEL" | b"LPUSH" | b"RPUSH" => Arity::AtLeast(3),
        b"ZADD" | b"HSET" | b"HMSET" => Arity::Pairs { min: 4, step: 2 },
        b"ZRANGE" | b"ZREVRANGE" | b"ZRANGEBYSCORE" => Arity::AtLeast(4),
        b"ZREMRANGEBYSCORE" => Arity::Exact(4),
        _ => return None,
    };
    Some(arity)
}

fn execute(name: &[u8], args: &[Vec<u8>], ks: &mut Keyspace) -> StoreResult<Vec<u8>> {
    let key = args.get(1).map(Vec::as_slice).unwrap_or_default();
    let reply = match name {
        b"PING" => match args.len() {
            1 => resp_simple("PONG"),
            2 => resp_bulk(&args[1]),
            _ => resp_error("wrong number of arguments for 'ping' command"),
        },

        // ---- keyspace ----
        b"EXISTS" => resp_integer(ks.exists(key) as i64),
        b"DEL" => resp_integer(args[1..].iter().filter(|k| ks.delete(k)).count() as i64),
        b"KEYS" => resp_array(&ks.keys(key)),
        b"EXPIRE" => match parse_i64(&args[2]) {
            Ok(seconds) => resp_integer(ks.expire(key, seconds)? as i64),
            Err(resp) => resp,
        },
        b"TTL" => match ks.ttl(key) {
            TtlStatus::Missing => resp_integer(-2),
            TtlStatus::NoExpiry => resp_integer(-1),
            TtlStatus::ExpiresIn(remaining) => {
                // Round up so a fresh `EXPIRE k 10` reports 10.
                let secs = remaining.as_millis().div_ceil(1000) as i64;
                resp_integer(secs)
            }
        },

        // ---- strings ----
        b"GET" => resp_optional(ks.get(key)?.as_deref()),
        b"SET" => handle_set(args, ks)?,
        b"MGET" => {
            let values: Vec<Option<Vec<u8>>> = args[1..]
                .iter()
                .map(|k| ks.get(k).unwrap_or(None))
                .collect();
            resp_nullable_array(&values)
        }
        b"MSET" => {
            for pair in args[1..].chunks(2) {
                ks.set(&pair[0], pair[1].clone());
            }
            resp_simple("OK")
        }

        // ---- sets ----
        b"SADD" => resp_integer(ks.sadd(key, &args[2..])?),
        b"SREM" => resp_integer(ks.srem(key, &args[2..])?),
        b"SCARD" => resp_integer(ks.scard(key)?),
        b"SISMEMBER" => resp_integer(ks.sismember(key, &args[2])? as i64),
        b"SMEMBERS" => resp_array(&ks.smembers(key)?),

        // ---- sorted sets ----
        b"ZADD" => {
            let mut pairs = Vec::with_capacity((args.len() - 2) / 2);
            for pair in args[2..].chunks(2) {
                match parse_score(&pair[0]) {
                    Ok(score) => pairs.push((score, pair[1].clone())),
                    Err(resp) => return Ok(resp),
                }
            }
            resp_integer(ks.zadd(key, pairs)?)
        }
        b"ZREM" => resp_integer(ks.zrem(key, &args[2..])?),
        b"ZCARD" => resp_integer(ks.zcard(key)?),
        b"ZRANK" | b"ZREVRANK" => match ks.zrank(key, &args[2], name == b"ZREVRANK")? {
            Some(rank) => resp_integer(rank),
            None => resp_null(),
        },
        b"ZRANGE" | b"ZREVRANGE" => {
            let with_scores = match trailing_withscores(args, 4) {
                Ok(flag) => flag,
                Err(resp) => return Ok(resp),
            };
            let (start, stop) = match (parse_i64(&args[2]), parse_i64(&args[3])) {
                (Ok(start), Ok(stop)) => (start, stop),
                (Err(resp), _) | (_, Err(resp)) => return Ok(resp),
            };
            let members = ks.zrange(key, start, stop, name == b"ZREVRANGE")?;
            scored_array(members, with_scores)
        }
        b"ZRANGEBYSCORE" => {
            let with_scores = match trailing_withscores(args, 4) {
                Ok(flag) => flag,
                Err(resp) => return Ok(resp),
            };
            let (min, max) = match (parse_limit(&args[2]), parse_limit(&args[3])) {
                (Ok(min), Ok(max)) => (min, max),
                (Err(resp), _) | (_, Err(resp)) => return Ok(resp),
            };
            scored_array(ks.zrange_by_score(key, min, max)?, with_scores)
        }
        b"ZREMRANGEBYSCORE" => {
            let (min, max) = match (parse_limit(&args[2]), parse_limit(&args[3])) {
                (Ok(min), Ok(max)) => (min, max),
                (Err(resp), _) | (_, Err(resp)) => return Ok(resp),
            };
            resp_integer(ks.zrem_range_by_score(key, min, max)?)
        }

        // ---- hashes ----
        b"HSET" | b"HMSET" => {
            let pairs = args[2..]
                .chunks(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()))
                .collect();
            let added = ks.hset(key, pairs)?;
            if name == b"HMSET" {
                resp_simple("OK")
            } else {
                resp_integer(added)
            }
        }
        b"HGET" => resp_optional(ks.hget(key, &args[2])?.as_deref()),
        b"HMGET" => resp_nullable_array(&ks.hmget(key, &args[2..])?),
        b"HDEL" => resp_integer(ks.hdel(key, &args[2..])?),
        b"HEXISTS" => resp_integer(ks.hexists(key, &args[2])? as i64),
        b"HKEYS" | b"HVALS" | b"HGETALL" => {
            let entries = ks.hgetall(key)?;
            let flat: Vec<Vec<u8>> = match name {
                b"HKEYS" => entries.into_iter().map(|(field, _)| field).collect(),
                b"HVALS" => entries.into_iter().map(|(_, value)| value).collect(),
                _ => entries.into_iter().flat_map(|(f, v)| [f, v]).collect(),
            };
            resp_array(&flat)
        }
        b"HLEN" => resp_integer(ks.hlen(key)?),

        // ---- lists ----
        b"LPUSH" | b"RPUSH" => resp_integer(ks.push(key, args[2..].to_vec(), name == b"LPUSH")?),
        b"LPOP" | b"RPOP" => resp_optional(ks.pop(key, name == b"LPOP")?.as_deref()),
        b"LINDEX" => match parse_i64(&args[2]) {
            Ok(index) => resp_optional(ks.lindex(key, index)?.as_deref()),
            Err(resp) => resp,
        },
        b"LLEN" => resp_integer(ks.llen(key)?),

        _ => resp_error("unknown command"),
    };
    Ok(reply)
}

fn handle_auth(args: &[Vec<u8>], session: &mut Session) -> Vec<u8> {
    if args.len() != 2 {
        return resp_error("wrong number of arguments for 'auth' command");
    }
    let Some(expected) = session.password.as_deref() else {
        return resp_error("AUTH called without any password configured");
    };
    if args[1].as_slice() == expected.as_bytes() {
        session.authenticated = true;
        resp_simple("OK")
    } else {
        session.authenticated = false;
        resp_coded_error("WRONGPASS", "invalid password")
    }
}

fn handle_set(args: &[Vec<u8>], ks: &mut Keyspace) -> StoreResult<Vec<u8>> {
    let key = &args[1];
    let reply = match args.len() {
        3 => {
            ks.set(key, args[2].clone());
            resp_simple("OK")
        }
        5 if args[3].eq_ignore_ascii_case(b"EX") => {
            let seconds = match parse_i64(&args[4]) {
                Ok(value) if value > 0 => value,
                Ok(_) => return Err(StoreError::InvalidExpire),
                Err(resp) => return Ok(resp),
            };
            ks.set_with_expiry(key, args[2].clone(), seconds)?;
            resp_simple("OK")
        }
        _ => resp_error("syntax error"),
    };
    Ok(reply)
}

// Returns whether a `WITHSCORES` flag sits at `position`; anything else there is a syntax error.
fn trailing_withscores(args: &[Vec<u8>], position: usize) -> Result<bool, Vec<u8>> {
    match args.len() - position {
        0 => Ok(false),
        1 if args[position].eq_ignore_ascii_case(b"WITHSCORES") => Ok(true),
        _ => Err(resp_error("syntax error")),
    }
}

fn scored_array(members: Vec<(Vec<u8>, f64)>, with_scores: bool) -> Vec<u8> {
    let flat: Vec<Vec<u8>> = if with_scores {
        members
            .into_iter()
            .flat_map(|(member, score)| [member, format_score(score).into_bytes()])
            .collect()
    } else {
        members.into_iter().map(|(member, _)| member).collect()
    };
    resp_array(&flat)
}

fn format_score(score: f64) -> String {
    if score == f64::INFINITY {
        "inf".to_string()
    } else if score == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        score.to_string()
    }
}

fn parse_i64(arg: &[u8]) -> Result<i64, Vec<u8>> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .ok_or_else(|| resp_error("value is not an integer or out of range"))
}

fn parse_score(arg: &[u8]) -> Result<f64, Vec<u8>> {
    match ScoreLimit::parse(arg) {
        Some(limit) if !limit.exclusive => Ok(limit.value),
        _ => Err(resp_error("value is not a valid float")),
    }
}

fn parse_limit(arg: &[u8]) -> Result<ScoreLimit, Vec<u8>> {
    ScoreLimit::parse(arg).ok_or_else(|| resp_error("min or max is not a float"))
}
