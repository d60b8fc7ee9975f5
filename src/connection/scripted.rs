//! In-memory [`Connection`] that replays scripted replies.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::Value;

use super::{Connection, TaskAndBody};
use crate::error::{OneViewError, Result, TransientKind};
use crate::tasks::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// One canned response.
#[derive(Debug, Clone)]
pub enum Reply {
    Document(Value),
    Accepted(Option<Task>, Value),
    Transient(TransientKind),
    Http { status: u16, message: String },
}

impl Reply {
    fn into_error(self) -> OneViewError {
        match self {
            Reply::Transient(kind) => OneViewError::TransientIo {
                kind,
                message: "scripted network failure".to_string(),
            },
            Reply::Http { status, message } => OneViewError::Http {
                status,
                message,
                error_code: None,
            },
            Reply::Document(_) | Reply::Accepted(..) => {
                OneViewError::Transport("scripted reply has the wrong shape".to_string())
            }
        }
    }
}

/// A request the connection received.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: Method,
    pub uri: String,
    pub body: Option<Value>,
}

/// Replies are queued per `(method, uri)`. The last queued reply repeats.
#[derive(Debug, Default)]
pub struct ScriptedConnection {
    replies: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, method: Method, uri: &str, reply: Reply) -> &Self {
        let mut replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        replies
            .entry((method, uri.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn on_get(&self, uri: &str, document: Value) -> &Self {
        self.reply(Method::Get, uri, Reply::Document(document))
    }

    pub fn on_get_error(&self, uri: &str, kind: TransientKind) -> &Self {
        self.reply(Method::Get, uri, Reply::Transient(kind))
    }

    pub fn on_write(&self, method: Method, uri: &str, task: Option<Task>, body: Value) -> &Self {
        self.reply(method, uri, Reply::Accepted(task, body))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn calls_to(&self, method: Method, uri: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.method == method && call.uri == uri)
            .count()
    }

    fn next(&self, method: Method, uri: &str, body: Option<&Value>) -> Result<Reply> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Call {
                method,
                uri: uri.to_string(),
                body: body.cloned(),
            });

        let mut replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        let queue = replies
            .get_mut(&(method, uri.to_string()))
            .filter(|queue| !queue.is_empty())
            .ok_or_else(|| OneViewError::Http {
                status: 404,
                message: format!("no scripted reply for {method:?} {uri}"),
                error_code: None,
            })?;

        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        reply.ok_or_else(|| OneViewError::Transport("empty reply queue".to_string()))
    }

    fn write(&self, method: Method, uri: &str, body: Option<&Value>) -> Result<TaskAndBody> {
        match self.next(method, uri, body)? {
            Reply::Accepted(task, body) => Ok((task, body)),
            Reply::Document(body) => Ok((None, body)),
            other => Err(other.into_error()),
        }
    }
}

impl Connection for ScriptedConnection {
    fn get(&self, uri: &str) -> Result<Value> {
        match self.next(Method::Get, uri, None)? {
            Reply::Document(document) => Ok(document),
            other => Err(other.into_error()),
        }
    }

    fn post(&self, uri: &str, body: &Value) -> Result<TaskAndBody> {
        self.write(Method::Post, uri, Some(body))
    }

    fn put(&self, uri: &str, body: &Value) -> Result<TaskAndBody> {
        self.write(Method::Put, uri, Some(body))
    }

    fn delete(&self, uri: &str) -> Result<TaskAndBody> {
        self.write(Method::Delete, uri, None)
    }
}
