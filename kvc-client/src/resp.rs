//! # RESP2 Encoding and Parsing
//!
//! Purpose: Encode client commands and decode store replies into the
//! four-variant `Reply` union.
//!
//! ## Design Principles
//! 1. **State-Free Parsing**: Replies are parsed top-down with minimal state.
//! 2. **Buffer Reuse**: Caller provides buffers to avoid per-call allocations.
//! 3. **Binary-Safe**: Bulk strings are treated as raw bytes.
//! 4. **Stay In Sync**: Error replies nested in arrays are read to the end
//!    before being reported, so the connection remains usable.

use std::io::{BufRead, Read};

use crate::error::{ClientError, ClientResult};

/// Largest bulk string accepted from the store.
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;
/// Largest array length accepted from the store.
pub const MAX_ARRAY_LEN: i64 = i32::MAX as i64;
// Upfront allocation cap; larger payloads grow as bytes arrive.
const PREALLOC_LIMIT: usize = 64 * 1024;

/// Decoded reply to one command.
///
/// Status lines (`+OK`) decode to `Bytes`; error lines never become a `Reply`
/// and surface as `ClientError::Server` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `$-1` or `*-1`: no value.
    Nil,
    /// `:123` responses.
    Integer(i64),
    /// Bulk strings and status lines.
    Bytes(Vec<u8>),
    /// `*N` arrays of nested replies.
    Array(Vec<Reply>),
}

impl Reply {
    /// Short name of the variant, used in coercion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Nil => "nil",
            Reply::Integer(_) => "integer",
            Reply::Bytes(_) => "bytes",
            Reply::Array(_) => "array",
        }
    }
}

/// Encodes a RESP2 array command into the provided buffer.
pub fn encode_command<A: AsRef<[u8]>>(name: &[u8], args: &[A], out: &mut Vec<u8>) {
    out.push(b'*');
    push_usize(out, args.len() + 1);
    out.extend_from_slice(b"\r\n");
    push_bulk(out, name);
    for arg in args {
        push_bulk(out, arg.as_ref());
    }
}

fn push_bulk(out: &mut Vec<u8>, data: &[u8]) {
    out.push(b'$');
    push_usize(out, data.len());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
}

/// Reads one reply from the buffered reader.
pub fn read_reply<R: BufRead>(reader: &mut R, line_buf: &mut Vec<u8>) -> ClientResult<Reply> {
    read_line(reader, line_buf)?;
    if line_buf.is_empty() {
        return Err(ClientError::protocol("empty reply line"));
    }

    match line_buf[0] {
        b'+' => Ok(Reply::Bytes(line_buf[1..].to_vec())),
        b'-' => Err(ClientError::Server(
            String::from_utf8_lossy(&line_buf[1..]).into_owned(),
        )),
        b':' => Ok(Reply::Integer(parse_i64(&line_buf[1..])?)),
        b'$' => {
            let len = parse_i64(&line_buf[1..])?;
            read_bulk(reader, len, line_buf)
        }
        b'*' => {
            let len = parse_i64(&line_buf[1..])?;
            read_array(reader, len, line_buf)
        }
        other => Err(ClientError::protocol(format!(
            "unknown reply prefix {:?}",
            other as char
        ))),
    }
}

fn read_bulk<R: BufRead>(reader: &mut R, len: i64, line_buf: &mut Vec<u8>) -> ClientResult<Reply> {
    if len < 0 {
        return Ok(Reply::Nil);
    }
    if len > MAX_BULK_LEN {
        return Err(ClientError::protocol(format!("bulk length {} exceeds limit", len)));
    }
    let len = len as usize;
    let mut data = Vec::with_capacity(len.min(PREALLOC_LIMIT));
    if reader.by_ref().take(len as u64).read_to_end(&mut data)? != len {
        return Err(ClientError::protocol("bulk string truncated"));
    }

    let mut crlf = [0u8; 2];
    reader.read_exact(&mut crlf)?;
    if crlf != [b'\r', b'\n'] {
        return Err(ClientError::protocol("bulk string missing CRLF"));
    }

    line_buf.clear();
    Ok(Reply::Bytes(data))
}

fn read_array<R: BufRead>(reader: &mut R, len: i64, line_buf: &mut Vec<u8>) -> ClientResult<Reply> {
    if len < 0 {
        return Ok(Reply::Nil);
    }

    if len > MAX_ARRAY_LEN {
        return Err(ClientError::protocol(format!("array length {} exceeds limit", len)));
    }
    let mut items = Vec::with_capacity((len as usize).min(64));
    let mut server_error = None;
    for _ in 0..len {
        match read_reply(reader, line_buf) {
            Ok(item) => items.push(item),
            Err(ClientError::Server(message)) => {
                // Keep draining so the next command starts on a clean frame.
                server_error.get_or_insert(message);
                items.push(Reply::Nil);
            }
            Err(err) => return Err(err),
        }
    }
    match server_error {
        Some(message) => Err(ClientError::Server(message)),
        None => Ok(Reply::Array(items)),
    }
}

fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> ClientResult<()> {
    buf.clear();
    let bytes = reader.read_until(b'\n', buf)?;
    if bytes == 0 {
        return Err(ClientError::protocol("connection closed by store"));
    }
    if buf.len() < 2 || buf[buf.len() - 2] != b'\r' {
        return Err(ClientError::protocol("reply line missing CRLF"));
    }
    buf.truncate(buf.len() - 2);
    Ok(())
}

fn parse_i64(data: &[u8]) -> ClientResult<i64> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .ok_or_else(|| ClientError::protocol("invalid integer in reply"))
}

fn push_usize(out: &mut Vec<u8>, mut value: usize) {
    // Write digits into a small stack buffer to avoid heap allocations.
    let mut buf = [0u8; 20];
    let mut len = 0;
    if value == 0 {
        buf[0] = b'0';
        len = 1;
    } else {
        while value > 0 {
            buf[len] = b'0' + (value % 10) as u8;
            value /= 10;
            len += 1;
        }
    }
    for idx in (0..len).rev() {
        out.push(buf[idx]);
    }
}
