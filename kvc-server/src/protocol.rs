//! # RESP2 Request Framing
//!
//! Purpose: Cut complete commands out of a connection's read buffer and
//! encode replies.
//!
//! ## Design Principles
//!
//! 1. **Incremental**: `parse` returns `Ok(None)` until a whole command has
//!    arrived and never consumes a partial frame.
//! 2. **Bounded**: Array length, bulk length and inline length are capped so a
//!    hostile peer cannot make the server allocate without limit.
//! 3. **Inline Friendly**: A line that does not start with `*` is split on
//!    whitespace, so `telnet` sessions work.

use bytes::{Buf, BytesMut};

pub const MAX_ARGS: usize = 1024 * 1024;
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;
pub const MAX_INLINE_LEN: usize = 64 * 1024;

/// Framing failure; the connection is closed after reporting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespError {
    Protocol(&'static str),
}

/// Stateless incremental parser for client requests.
#[derive(Debug, Default)]
pub struct RespParser;

impl RespParser {
    pub fn new() -> Self {
        RespParser
    }

    /// Removes one complete command from `buffer`, if present.
    pub fn parse(&mut self, buffer: &mut BytesMut) -> Result<Option<Vec<Vec<u8>>>, RespError> {
        let mut pos = 0;
        let args = match buffer.first() {
            None => return Ok(None),
            Some(b'*') => match parse_multibulk(buffer, &mut pos)? {
                Some(args) => args,
                None => return Ok(None),
            },
            Some(_) => match parse_inline(buffer, &mut pos)? {
                Some(args) => args,
                None => return Ok(None),
            },
        };
        buffer.advance(pos);
        Ok(Some(args))
    }
}

fn parse_multibulk(buf: &[u8], pos: &mut usize) -> Result<Option<Vec<Vec<u8>>>, RespError> {
    let Some(header) = next_line(buf, pos, MAX_INLINE_LEN)? else {
        return Ok(None);
    };
    let count = parse_len(&header[1..], "invalid multibulk length")?;
    if count > MAX_ARGS {
        return Err(RespError::Protocol("too many arguments"));
    }
    let mut args = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        let Some(line) = next_line(buf, pos, MAX_INLINE_LEN)? else {
            return Ok(None);
        };
        let len = match line.split_first() {
            Some((b'$', digits)) => parse_len(digits, "invalid bulk length")?,
            _ => return Err(RespError::Protocol("expected '$'")),
        };
        if len > MAX_BULK_LEN {
            return Err(RespError::Protocol("bulk too large"));
        }
        let end = *pos + len;
        if buf.len() < end + 2 {
            return Ok(None);
        }
        if &buf[end..end + 2] != b"\r\n" {
            return Err(RespError::Protocol("bulk not terminated"));
        }
        args.push(buf[*pos..end].to_vec());
        *pos = end + 2;
    }
    Ok(Some(args))
}

fn parse_inline(buf: &[u8], pos: &mut usize) -> Result<Option<Vec<Vec<u8>>>, RespError> {
    let Some(line) = next_line(buf, pos, MAX_INLINE_LEN)? else {
        return Ok(None);
    };
    Ok(Some(
        line.split(|b| b.is_ascii_whitespace())
            .filter(|word| !word.is_empty())
            .map(<[u8]>::to_vec)
            .collect(),
    ))
}

// Returns the line at `pos` without its terminator and moves `pos` past it.
fn next_line<'a>(buf: &'a [u8], pos: &mut usize, limit: usize) -> Result<Option<&'a [u8]>, RespError> {
    let rest = &buf[*pos..];
    let Some(newline) = rest.iter().position(|&b| b == b'\n') else {
        if rest.len() > limit {
            return Err(RespError::Protocol("line too long"));
        }
        return Ok(None);
    };
    if newline > limit {
        return Err(RespError::Protocol("line too long"));
    }
    let line = &rest[..newline];
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    *pos += newline + 1;
    Ok(Some(line))
}

fn parse_len(digits: &[u8], message: &'static str) -> Result<usize, RespError> {
    std::str::from_utf8(digits)
        .ok()
        .and_then(|text| text.parse::<usize>().ok())
        .ok_or(RespError::Protocol(message))
}

pub fn resp_simple(message: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(message.len() + 3);
    buf.push(b'+');
    buf.extend_from_slice(message.as_bytes());
    buf.extend_from_slice(b"\r\n");
    buf
}

/// Error reply with the generic `ERR` prefix.
pub fn resp_error(message: &str) -> Vec<u8> {
    resp_coded_error("ERR", message)
}

/// Error reply with a specific code such as `WRONGTYPE` or `NOAUTH`.
pub fn resp_coded_error(code: &str, message: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(code.len() + message.len() + 4);
    buf.push(b'-');
    buf.extend_from_slice(code.as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(message.as_bytes());
    buf.extend_from_slice(b"\r\n");
    buf
}

pub fn resp_integer(value: i64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(24);
    buf.push(b':');
    buf.extend_from_slice(value.to_string().as_bytes());
    buf.extend_from_slice(b"\r\n");
    buf
}

pub fn resp_bulk(data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(data.len() + 16);
    push_bulk(&mut buf, data);
    buf
}

pub fn resp_null() -> Vec<u8> {
    b"$-1\r\n".to_vec()
}

pub fn resp_optional(value: Option<&[u8]>) -> Vec<u8> {
    match value {
        Some(data) => resp_bulk(data),
        None => resp_null(),
    }
}

/// Array of bulk strings.
pub fn resp_array<T: AsRef<[u8]>>(items: &[T]) -> Vec<u8> {
    let mut buf = array_header(items.len());
    for item in items {
        push_bulk(&mut buf, item.as_ref());
    }
    buf
}

/// Array whose `None` entries are encoded as null bulks.
pub fn resp_nullable_array(items: &[Option<Vec<u8>>]) -> Vec<u8> {
    let mut buf = array_header(items.len());
    for item in items {
        match item {
            Some(data) => push_bulk(&mut buf, data),
            None => buf.extend_from_slice(b"$-1\r\n"),
        }
    }
    buf
}

fn array_header(len: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16);
    buf.push(b'*');
    buf.extend_from_slice(len.to_string().as_bytes());
    buf.extend_from_slice(b"\r\n");
    buf
}

fn push_bulk(buf: &mut Vec<u8>, data: &[u8]) {
    buf.push(b'$');
    buf.extend_from_slice(data.len().to_string().as_bytes());
    buf.extend_from_slice(b"\r\n");
    buf.extend_from_slice(data);
    buf.extend_from_slice(b"\r\n");
}
