//! # Command Executor
//!
//! Purpose: Assemble one command invocation and run it on a pooled
//! connection, logging failures exactly once.
//!
//! ## Design Principles
//! 1. **Builder Pattern**: `Command` collects arguments of mixed types as bytes.
//! 2. **Single Log Point**: Transport and server failures are logged here with
//!    the command name and key, then returned untouched.
//! 3. **No Retries**: A failed command is reported to the caller as-is.

use kvc_common::Logger;

use crate::error::ClientResult;
use crate::pool::PooledConnection;
use crate::resp::Reply;

/// Conversion of a call argument into its wire bytes.
pub trait ToArg {
    fn write_arg(&self, out: &mut Vec<u8>);
}

impl ToArg for [u8] {
    fn write_arg(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self);
    }
}

impl ToArg for str {
    fn write_arg(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }
}

impl ToArg for Vec<u8> {
    fn write_arg(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self);
    }
}

impl ToArg for String {
    fn write_arg(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }
}

impl ToArg for i64 {
    fn write_arg(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.to_string().as_bytes());
    }
}

impl ToArg for f64 {
    fn write_arg(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.to_string().as_bytes());
    }
}

impl<T: ToArg + ?Sized> ToArg for &T {
    fn write_arg(&self, out: &mut Vec<u8>) {
        (**self).write_arg(out);
    }
}

/// One command invocation: a name plus its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: &'static str,
    args: Vec<Vec<u8>>,
}

impl Command {
    pub fn new(name: &'static str) -> Self {
        Command {
            name,
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg<T: ToArg + ?Sized>(mut self, value: &T) -> Self {
        let mut buf = Vec::new();
        value.write_arg(&mut buf);
        self.args.push(buf);
        self
    }

    /// Appends every item of `values`.
    pub fn args<I>(mut self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToArg,
    {
        for value in values {
            let mut buf = Vec::new();
            value.write_arg(&mut buf);
            self.args.push(buf);
        }
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn arg_list(&self) -> &[Vec<u8>] {
        &self.args
    }

    /// First argument rendered for log context; by convention the key.
    pub fn key(&self) -> String {
        self.args
            .first()
            .map(|key| String::from_utf8_lossy(key).into_owned())
            .unwrap_or_default()
    }
}

/// Runs `command` on `conn` and returns the raw reply.
///
/// A `Nil` reply is a valid result. Every error is logged once with the
/// command name, key and cause before being returned.
pub fn execute(
    logger: &dyn Logger,
    conn: &mut PooledConnection,
    command: &Command,
) -> ClientResult<Reply> {
    let result = conn.exec(command.name.as_bytes(), &command.args);
    if let Err(err) = &result {
        logger.error(
            "kvcache command failed",
            &[("command", &command.name), ("key", &command.key()), ("error", err)],
        );
    }
    result
}
