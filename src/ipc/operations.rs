//! Endpoint operation handlers.
//!
//! Maps each endpoint's request bytes to calls on the subscription store and
//! the feed sources, and renders the result as a response payload.

use std::fmt::Display;

use anyhow::{Result, bail};
use tracing::{error, info};

use crate::context::AppContext;
use crate::core::scheduler;

use super::protocol::Response;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Fetch,
    Add,
    Get,
    Remove,
    Refresh,
    Search,
    Subscriptions,
    Health,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::Fetch,
        Operation::Add,
        Operation::Get,
        Operation::Remove,
        Operation::Refresh,
        Operation::Search,
        Operation::Subscriptions,
        Operation::Health,
    ];

    /// Name used in the socket file and in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Add => "add",
            Self::Get => "get",
            Self::Remove => "rm",
            Self::Refresh => "refresh",
            Self::Search => "search",
            Self::Subscriptions => "subs",
            Self::Health => "health",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }

    /// Refresh and subs act on the whole store and never read a request.
    pub fn reads_request(&self) -> bool {
        !matches!(self, Self::Refresh | Self::Subscriptions)
    }
}

/// Executes operations against the shared daemon state.
pub struct OperationHandler {
    ctx: AppContext,
}

impl OperationHandler {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Run `operation` on `request`. `None` means the connection gets no reply.
    pub async fn handle(&self, operation: Operation, request: &[u8]) -> Option<Response> {
        let text = String::from_utf8_lossy(request);
        let operand = trim_line(&text);

        let result = match operation {
            Operation::Fetch => self.fetch(operand).await,
            Operation::Add => self.add(operand).await,
            Operation::Get => self.get(operand).await,
            Operation::Remove => self.remove(operand).await,
            Operation::Search => self.search(operand).await,
            Operation::Subscriptions => Ok(self.subscriptions().await),
            Operation::Health => Ok(quote_bytes(request)),
            Operation::Refresh => {
                scheduler::refresh(&self.ctx).await;
                return None;
            }
        };

        Some(reply(operation, operand, result))
    }

    /// Resolve and fetch a channel without subscribing to it.
    async fn fetch(&self, name: &str) -> Result<String> {
        let record = self.ctx.sources.lookup(name).await?;
        Ok(record.to_string())
    }

    async fn add(&self, name: &str) -> Result<String> {
        if self.ctx.store.get(name).await.is_ok() {
            bail!("already subscribed to channel {:?}", name);
        }

        let record = self.ctx.sources.lookup(name).await?;
        self.ctx
            .store
            .add(name, record, &self.ctx.notifications)
            .await?;

        info!(source = %name, "Subscribed");
        Ok(format!("subscribed to channel {:?}", name))
    }

    async fn get(&self, name: &str) -> Result<String> {
        let record = self.ctx.store.get(name).await?;
        Ok(record.to_string())
    }

    async fn remove(&self, name: &str) -> Result<String> {
        if self.ctx.store.remove(name).await {
            info!(source = %name, "Unsubscribed");
        }
        Ok(format!("unsubscribed from channel {:?}", name))
    }

    async fn search(&self, query: &str) -> Result<String> {
        let handles = self.ctx.sources.search.search(query).await?;
        if handles.is_empty() {
            return Ok(format!("found no channel like {:?}", query));
        }
        Ok(handles.join(", "))
    }

    async fn subscriptions(&self) -> String {
        let mut names: Vec<String> = self
            .ctx
            .store
            .list()
            .await
            .into_iter()
            .map(|record| record.name)
            .collect();

        if names.is_empty() {
            return "no subscriptions".to_string();
        }
        names.sort();
        names.join("\n")
    }
}

fn reply<E: Display>(operation: Operation, operand: &str, result: Result<String, E>) -> Response {
    match result {
        Ok(payload) => Response::success(payload),
        Err(e) => {
            error!(endpoint = operation.name(), operand = %operand, error = %e, "Request failed");
            Response::failure(e.to_string())
        }
    }
}

/// Drop one trailing line terminator (`\n` or `\r\n`).
fn trim_line(text: &str) -> &str {
    match text.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => text,
    }
}

/// Quote raw request bytes as a double-quoted literal.
///
/// Printable characters pass through and the usual short escapes are used.
/// Other ASCII controls and bytes that are not valid UTF-8 become `\xNN`.
/// Remaining non-printable characters become `\uNNNN` or `\UNNNNNNNN`.
fn quote_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    for chunk in bytes.utf8_chunks() {
        for c in chunk.valid().chars() {
            push_escaped(&mut out, c);
        }
        for b in chunk.invalid() {
            out.push_str(&format!("\\x{:02x}", b));
        }
    }
    out.push('"');
    out
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        '\u{07}' => out.push_str("\\a"),
        '\u{08}' => out.push_str("\\b"),
        '\u{0c}' => out.push_str("\\f"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\u{0b}' => out.push_str("\\v"),
        c if c < ' ' || c == '\u{7f}' => out.push_str(&format!("\\x{:02x}", c as u32)),
        c if is_printable(c) => out.push(c),
        c if (c as u32) < 0x10000 => out.push_str(&format!("\\u{:04x}", c as u32)),
        c => out.push_str(&format!("\\U{:08x}", c as u32)),
    }
}

/// Space is the only printable separator. Format, tag and private-use
/// characters are not printable.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    !(c.is_control()
        || c.is_whitespace()
        || matches!(
            c,
            '\u{ad}'
                | '\u{200b}'..='\u{200f}'
                | '\u{2060}'..='\u{2064}'
                | '\u{e000}'..='\u{f8ff}'
                | '\u{feff}'
                | '\u{e0000}'..='\u{e007f}'
                | '\u{f0000}'..='\u{10ffff}'
        ))
}
