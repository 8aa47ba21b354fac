//! End-to-end behaviour against the in-memory reference server.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use kvc_client::{CacheClient, ClientError, ScoreBound, RANK_MISSING};
use kvc_common::{CacheOptions, LogOptions, Logger, LoggerRegistry};
use kvc_server::{ServerConfig, ServerHandle};

fn start(password: Option<&str>) -> ServerHandle {
    kvc_server::spawn(ServerConfig::ephemeral(password)).expect("spawn server")
}

fn connect(server: &ServerHandle, password: &str) -> CacheClient {
    let registry = LoggerRegistry::new();
    let logger: Arc<dyn Logger> = registry.get_or_create("store-tests", &LogOptions::default());
    let options = CacheOptions {
        host: server.addr().ip().to_string(),
        port: server.addr().port().to_string(),
        password: password.to_string(),
        max_idle: 2,
        max_active: 4,
        read_timeout_ms: Some(2000),
        ..CacheOptions::default()
    };
    CacheClient::new(options, logger).expect("client")
}

fn strings(items: &[&str]) -> Vec<Vec<u8>> {
    items.iter().map(|item| item.as_bytes().to_vec()).collect()
}

fn sorted(mut items: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
    items.sort();
    items
}

#[test]
fn unwritten_key_is_empty_and_absent() {
    let server = start(None);
    let client = connect(&server, "");

    assert!(client.get("never-written").expect("get").is_empty());
    assert!(!client.exists("never-written").expect("exists"));
    client.del("never-written").expect("del of absent key");
}

#[test]
fn string_roundtrip_and_mget_positions() {
    let server = start(None);
    let client = connect(&server, "");

    client.set("a", b"1", 0).expect("set a");
    client.set("c", b"3", 0).expect("set c");
    assert_eq!(client.get("a").expect("get"), b"1".to_vec());
    assert_eq!(
        client.mget(&["a", "b", "c"]).expect("mget"),
        strings(&["1", "", "3"])
    );
    assert!(client.mget(&[]).expect("empty mget").is_empty());

    client
        .mset(&[("x", b"10".as_slice()), ("y", b"20".as_slice())], 0)
        .expect("mset");
    client.dels(&["a", "x", "missing"]).expect("dels");
    assert!(!client.exists("a").expect("exists a"));
    assert!(client.exists("y").expect("exists y"));
}

#[test]
fn ttl_expires_keys() {
    let server = start(None);
    let client = connect(&server, "");

    client.set("short", b"v", 1).expect("set with ttl");
    assert!(client.exists("short").expect("exists"));
    thread::sleep(Duration::from_millis(1100));
    assert!(client.get("short").expect("get").is_empty());

    client.set("manual", b"v", 0).expect("set");
    assert!(client.expire("manual", 100).expect("expire"));
    assert!(!client.expire("nope", 100).expect("expire missing"));
}

#[test]
fn out_of_range_ttl_is_a_server_error() {
    let server = start(None);
    let client = connect(&server, "");

    let err = client.set("far", b"v", i64::MAX).expect_err("ttl out of range");
    assert!(matches!(err, ClientError::Server(ref msg) if msg.contains("invalid expire time")));
    // The value was written by SET; only its EXPIRE was refused.
    assert_eq!(client.get("far").expect("get"), b"v".to_vec());
    assert_eq!(client.ping().expect("ping"), b"PONG".to_vec());
}

#[test]
fn keys_matches_glob_patterns() {
    let server = start(None);
    let client = connect(&server, "");

    client.set("user:1", b"a", 0).expect("set");
    client.set("user:2", b"b", 0).expect("set");
    client.set("session:1", b"c", 0).expect("set");

    assert_eq!(sorted(client.keys("user:*").expect("keys")), strings(&["user:1", "user:2"]));
    assert!(client.keys("nothing*").expect("keys").is_empty());
}

#[test]
fn set_members_are_unique() {
    let server = start(None);
    let client = connect(&server, "");

    client.sadd("tags", 0, &[b"a".as_slice(), b"b".as_slice()]).expect("sadd");
    client.sadd("tags", 0, &[b"a".as_slice()]).expect("sadd again");
    assert_eq!(client.scard("tags").expect("scard"), 2);
    assert!(client.sismember("tags", b"a").expect("sismember"));
    assert!(!client.sismember("tags", b"z").expect("sismember"));
    assert_eq!(sorted(client.smembers("tags").expect("smembers")), strings(&["a", "b"]));
    assert_eq!(client.srem("tags", &[b"a".as_slice(), b"z".as_slice()]).expect("srem"), 1);
    assert_eq!(client.scard("tags").expect("scard"), 1);
}

#[test]
fn sorted_set_ranges_and_ranks() {
    let server = start(None);
    let client = connect(&server, "");

    client
        .zadd(
            "board",
            0,
            &[b"200".as_slice(), b"m1".as_slice(), b"100".as_slice(), b"m2".as_slice()],
        )
        .expect("zadd");

    assert_eq!(client.zrange("board", 0, -1, false).expect("zrange"), strings(&["m2", "m1"]));
    assert_eq!(client.zrevrange("board", 0, 0, false).expect("zrevrange"), strings(&["m1"]));
    assert_eq!(
        client.zrange("board", 0, -1, true).expect("zrange withscores"),
        strings(&["m2", "100", "m1", "200"])
    );
    assert_eq!(client.zrank("board", b"m1").expect("zrank"), 1);
    assert_eq!(client.zrevrank("board", b"m1").expect("zrevrank"), 0);
    assert_eq!(client.zrank("board", b"ghost").expect("zrank"), RANK_MISSING);
    assert_eq!(client.zrank("no-board", b"m1").expect("zrank"), -1);
    assert_eq!(client.zcard("board").expect("zcard"), 2);

    assert_eq!(
        client
            .zrange_by_score("board", ScoreBound::Exclusive(100.0), ScoreBound::PosInf, false)
            .expect("zrangebyscore"),
        strings(&["m1"])
    );
    assert_eq!(client.zrem_range_by_score("board", 0i64, 150i64).expect("zremrangebyscore"), 1);
    assert_eq!(client.zrem("board", &[b"m1".as_slice()]).expect("zrem"), 1);
    assert_eq!(client.zcard("board").expect("zcard"), 0);
}

#[test]
fn hash_fields() {
    let server = start(None);
    let client = connect(&server, "");

    client.hset("h", 0, b"f1", b"v1").expect("hset");
    client
        .hmset("h", 0, &[b"f2".as_slice(), b"v2".as_slice(), b"f3".as_slice(), b"v3".as_slice()])
        .expect("hmset");

    assert_eq!(client.hget("h", b"f2").expect("hget"), b"v2".to_vec());
    assert!(client.hget("h", b"nope").expect("hget").is_empty());
    assert_eq!(
        client.hmget("h", &[b"f1".as_slice(), b"nope".as_slice(), b"f3".as_slice()]).expect("hmget"),
        strings(&["v1", "", "v3"])
    );
    assert!(client.hexists("h", b"f1").expect("hexists"));
    assert_eq!(client.hlen("h").expect("hlen"), 3);
    assert_eq!(sorted(client.hkeys("h").expect("hkeys")), strings(&["f1", "f2", "f3"]));
    assert_eq!(sorted(client.hvals("h").expect("hvals")), strings(&["v1", "v2", "v3"]));
    assert_eq!(client.hgetall("h").expect("hgetall").len(), 6);
    assert_eq!(client.hdel("h", &[b"f1".as_slice(), b"nope".as_slice()]).expect("hdel"), 1);
    assert!(!client.hexists("h", b"f1").expect("hexists"));
}

#[test]
fn list_ends() {
    let server = start(None);
    let client = connect(&server, "");

    assert_eq!(client.lrpush("l", &[b"b".as_slice(), b"c".as_slice()]).expect("lrpush"), 2);
    assert_eq!(client.llpush("l", &[b"a".as_slice()]).expect("llpush"), 3);
    assert_eq!(client.lllen("l").expect("llen"), 3);
    assert_eq!(client.lindex("l", 0).expect("lindex"), b"a".to_vec());
    assert_eq!(client.lindex("l", -1).expect("lindex"), b"c".to_vec());
    assert!(client.lindex("l", 10).expect("lindex").is_empty());
    assert_eq!(client.lrpop("l").expect("lrpop"), b"c".to_vec());
    assert_eq!(client.llpop("l").expect("llpop"), b"a".to_vec());
    assert_eq!(client.llpop("l").expect("llpop"), b"b".to_vec());
    assert!(client.llpop("l").expect("llpop on empty").is_empty());
}

#[test]
fn wrong_type_surfaces_as_server_error() {
    let server = start(None);
    let client = connect(&server, "");

    client.set("plain", b"v", 0).expect("set");
    let err = client.sadd("plain", 10, &[b"x".as_slice()]).expect_err("wrong type");
    assert!(matches!(err, ClientError::Server(ref msg) if msg.starts_with("WRONGTYPE")));
    // The failed write did not set an expiration either.
    assert_eq!(client.get("plain").expect("get"), b"v".to_vec());
}

#[test]
fn password_protected_store() {
    let server = start(Some("s3cret"));

    let good = connect(&server, "s3cret");
    assert_eq!(good.ping().expect("ping"), b"PONG".to_vec());

    let bad = connect(&server, "wrong");
    assert!(matches!(bad.ping(), Err(ClientError::Auth(_))));
    assert_eq!(bad.pool_stats().active, 0);

    let anonymous = connect(&server, "");
    assert!(matches!(anonymous.ping(), Err(ClientError::Server(ref msg)) if msg.starts_with("NOAUTH")));
}

#[test]
fn closed_client_rejects_calls() {
    let server = start(None);
    let client = connect(&server, "");

    client.ping().expect("ping");
    client.close();
    assert!(matches!(client.get("k"), Err(ClientError::PoolClosed)));
}

#[test]
fn clones_share_the_pool() {
    let server = start(None);
    let client = connect(&server, "");

    let workers: Vec<_> = (0..8)
        .map(|idx| {
            let client = client.clone();
            thread::spawn(move || {
                let key = format!("worker:{}", idx);
                client.set(&key, b"done", 0).expect("set");
                client.get(&key).expect("get")
            })
        })
        .collect();
    for worker in workers {
        assert_eq!(worker.join().expect("worker"), b"done".to_vec());
    }

    // Every connection is back in the pool, trimmed to `max_idle`.
    let stats = client.pool_stats();
    assert_eq!(stats.active, stats.idle);
    assert!(stats.idle <= 2);
}
