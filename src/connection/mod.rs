//! Authenticated access to the appliance REST API.
//!
//! The task monitor and resource clients only see the [`Connection`] trait.
//! [`HttpConnection`] talks to a real appliance. With the `test-util`
//! feature, `ScriptedConnection` replays canned responses for tests.

mod http;
#[cfg(any(test, feature = "test-util"))]
mod scripted;

pub use http::{Credentials, HttpConnection};
#[cfg(any(test, feature = "test-util"))]
pub use scripted::{Call, Method, Reply, ScriptedConnection};

use serde_json::Value;

use crate::error::Result;
use crate::tasks::Task;

/// Response of a write request: the task the server started, if any, and the body.
pub type TaskAndBody = (Option<Task>, Value);

pub trait Connection: Send + Sync {
    fn get(&self, uri: &str) -> Result<Value>;
    fn post(&self, uri: &str, body: &Value) -> Result<TaskAndBody>;
    fn put(&self, uri: &str, body: &Value) -> Result<TaskAndBody>;
    fn delete(&self, uri: &str) -> Result<TaskAndBody>;
}

/// Pull the `members` array out of a collection document.
pub fn members(collection: Value) -> Vec<Value> {
    match collection {
        Value::Object(mut map) => match map.remove("members") {
            Some(Value::Array(members)) => members,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_members_extracts_array() {
        let collection = json!({"members": [{"name": "a"}, {"name": "b"}], "count": 2});
        assert_eq!(members(collection).len(), 2);
    }

    #[test]
    fn test_members_missing_or_null() {
        assert!(members(json!({"count": 0})).is_empty());
        assert!(members(json!({"members": null})).is_empty());
        assert!(members(json!([])).is_empty());
    }
}
