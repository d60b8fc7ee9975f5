//! Generic CRUD client for one REST collection.

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;
use tracing::debug;

use crate::connection::{members, Connection, TaskAndBody};
use crate::error::{OneViewError, Result};
use crate::tasks::{TaskMonitor, WaitTimeout};

pub const MSG_RESOURCE_NOT_PROVIDED: &str = "Resource was not provided";
pub const MSG_INVALID_ID: &str = "Invalid id was provided";
pub const MSG_INVALID_FIELD: &str = "Invalid field was provided";
pub const MSG_RESOURCE_URI_NOT_PROVIDED: &str = "Resource URI was not provided";

/// Characters left as is in query values: alphanumerics, `-_.~` and `/`.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

fn encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

/// Paging, filtering and projection for a collection listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
    pub start: u64,
    /// `-1` requests every member
    pub count: i64,
    pub filter: Option<String>,
    pub query: Option<String>,
    pub sort: Option<String>,
    pub view: Option<String>,
    pub fields: Option<String>,
}

impl Default for CollectionQuery {
    fn default() -> Self {
        Self {
            start: 0,
            count: -1,
            filter: None,
            query: None,
            sort: None,
            view: None,
            fields: None,
        }
    }
}

impl CollectionQuery {
    pub fn page(start: u64, count: i64) -> Self {
        Self {
            start,
            count,
            ..Self::default()
        }
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }
}

/// Options for a utilization request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtilizationQuery {
    /// Comma-separated metric names
    pub fields: Option<String>,
    /// Comma-separated conditions; each one is sent as its own `filter`
    pub filter: Option<String>,
    pub refresh: bool,
    pub view: Option<String>,
}

/// What to delete: an id or URI, or a resource document carrying its `uri`.
#[derive(Debug, Clone, Copy)]
pub enum DeleteTarget<'a> {
    Id(&'a str),
    Resource(&'a Value),
}

impl<'a> From<&'a str> for DeleteTarget<'a> {
    fn from(id_or_uri: &'a str) -> Self {
        DeleteTarget::Id(id_or_uri)
    }
}

impl<'a> From<&'a Value> for DeleteTarget<'a> {
    fn from(resource: &'a Value) -> Self {
        DeleteTarget::Resource(resource)
    }
}

/// Client for the collection rooted at `uri`.
///
/// Write operations come in two forms: the plain one blocks on the task the
/// server starts and returns the resolved entity; the `_async` one returns
/// the task and response body as soon as the request is accepted.
#[derive(Clone)]
pub struct ResourceClient {
    connection: Arc<dyn Connection>,
    uri: String,
    monitor: TaskMonitor,
}

impl ResourceClient {
    pub fn new(connection: Arc<dyn Connection>, uri: impl Into<String>) -> Self {
        let monitor = TaskMonitor::new(Arc::clone(&connection));
        Self {
            connection,
            uri: uri.into(),
            monitor,
        }
    }

    pub fn with_monitor(mut self, monitor: TaskMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn monitor(&self) -> &TaskMonitor {
        &self.monitor
    }

    pub fn build_query_uri(&self, query: &CollectionQuery) -> String {
        let mut uri = format!("{}?start={}&count={}", self.uri, query.start, query.count);
        let optional = [
            ("filter", &query.filter),
            ("query", &query.query),
            ("sort", &query.sort),
            ("view", &query.view),
            ("fields", &query.fields),
        ];
        for (key, value) in optional {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                uri.push_str(&format!("&{key}={}", encode(value)));
            }
        }
        uri
    }

    /// Resolve an id to `{uri}/{id}`; a URI must belong to this collection.
    pub fn build_uri(&self, id_or_uri: &str) -> Result<String> {
        if id_or_uri.is_empty() {
            return Err(OneViewError::InvalidArgument(MSG_INVALID_ID.to_string()));
        }
        if id_or_uri.starts_with('/') {
            if !id_or_uri.starts_with(&self.uri) {
                return Err(OneViewError::unrecognized_uri());
            }
            return Ok(id_or_uri.to_string());
        }
        Ok(format!("{}/{}", self.uri, id_or_uri))
    }

    pub fn get_all(&self, query: &CollectionQuery) -> Result<Vec<Value>> {
        self.get_collection(&self.build_query_uri(query))
    }

    /// Members of the collection document at `uri`.
    pub fn get_collection(&self, uri: &str) -> Result<Vec<Value>> {
        debug!(uri, "listing collection");
        Ok(members(self.connection.get(uri)?))
    }

    pub fn get(&self, id_or_uri: &str) -> Result<Value> {
        let uri = self.build_uri(id_or_uri)?;
        self.connection.get(&uri)
    }

    /// Members whose `field` equals `value`.
    ///
    /// The server-side filter is case sensitive; for top-level fields the
    /// result is matched again here ignoring case.
    pub fn get_by(&self, field: &str, value: &str) -> Result<Vec<Value>> {
        if field.is_empty() {
            return Err(OneViewError::InvalidArgument(MSG_INVALID_FIELD.to_string()));
        }

        let filter = format!("\"'{field}'='{value}'\"");
        let results = self.get_all(&CollectionQuery::default().filter(filter))?;
        if field.contains('.') {
            return Ok(results);
        }

        let wanted = value.to_lowercase();
        Ok(results
            .into_iter()
            .filter(|member| {
                member
                    .get(field)
                    .and_then(Value::as_str)
                    .is_some_and(|actual| actual.to_lowercase() == wanted)
            })
            .collect())
    }

    pub fn get_schema(&self) -> Result<Value> {
        self.connection.get(&format!("{}/schema", self.uri))
    }

    pub fn get_utilization(&self, id_or_uri: &str, query: &UtilizationQuery) -> Result<Value> {
        let mut params: Vec<String> = Vec::new();
        if let Some(filter) = query.filter.as_deref() {
            params.extend(
                filter
                    .split(',')
                    .filter(|condition| !condition.is_empty())
                    .map(|condition| format!("filter={}", encode(condition))),
            );
        }
        if let Some(fields) = query.fields.as_deref().filter(|f| !f.is_empty()) {
            params.push(format!("fields={}", encode(fields)));
        }
        if query.refresh {
            params.push("refresh=true".to_string());
        }
        if let Some(view) = query.view.as_deref().filter(|v| !v.is_empty()) {
            params.push(format!("view={}", encode(view)));
        }

        let mut uri = format!("{}/utilization", self.build_uri(id_or_uri)?);
        if !params.is_empty() {
            uri.push('?');
            uri.push_str(&params.join("&"));
        }
        self.connection.get(&uri)
    }

    pub fn create(&self, resource: &Value, timeout: WaitTimeout) -> Result<Value> {
        let accepted = self.create_async(resource)?;
        self.finish(accepted, timeout)
    }

    pub fn create_async(&self, resource: &Value) -> Result<TaskAndBody> {
        require_resource(resource)?;
        debug!(uri = %self.uri, "creating resource");
        self.connection.post(&self.uri, resource)
    }

    /// Replace a resource. `uri` defaults to the resource's own `uri`.
    pub fn update(
        &self,
        resource: &Value,
        uri: Option<&str>,
        timeout: WaitTimeout,
    ) -> Result<Value> {
        let accepted = self.update_async(resource, uri)?;
        self.finish(accepted, timeout)
    }

    pub fn update_async(&self, resource: &Value, uri: Option<&str>) -> Result<TaskAndBody> {
        require_resource(resource)?;
        let target = match uri.filter(|uri| !uri.is_empty()) {
            Some(uri) => uri,
            None => resource
                .get("uri")
                .and_then(Value::as_str)
                .filter(|uri| !uri.is_empty())
                .ok_or_else(|| {
                    OneViewError::InvalidArgument(MSG_RESOURCE_URI_NOT_PROVIDED.to_string())
                })?,
        };
        debug!(uri = target, "updating resource");
        self.connection.put(target, resource)
    }

    /// Delete and wait. A delete-like task resolves to `true`.
    pub fn delete<'a>(
        &self,
        target: impl Into<DeleteTarget<'a>>,
        force: bool,
        timeout: WaitTimeout,
    ) -> Result<Value> {
        let accepted = self.delete_async(target, force)?;
        self.finish(accepted, timeout)
    }

    pub fn delete_async<'a>(
        &self,
        target: impl Into<DeleteTarget<'a>>,
        force: bool,
    ) -> Result<TaskAndBody> {
        let mut uri = match target.into() {
            DeleteTarget::Id(id_or_uri) => {
                if id_or_uri.is_empty() {
                    return Err(OneViewError::InvalidArgument(
                        MSG_RESOURCE_NOT_PROVIDED.to_string(),
                    ));
                }
                self.build_uri(id_or_uri)?
            }
            DeleteTarget::Resource(resource) => {
                require_resource(resource)?;
                resource
                    .get("uri")
                    .and_then(Value::as_str)
                    .filter(|uri| !uri.is_empty())
                    .ok_or_else(OneViewError::unknown_object_type)?
                    .to_string()
            }
        };
        if force {
            uri.push_str("?force=True");
        }
        debug!(uri = %uri, force, "deleting resource");
        self.connection.delete(&uri)
    }

    /// Wait on the accepted task, or hand back the body when the server
    /// answered synchronously.
    fn finish(&self, (task, body): TaskAndBody, timeout: WaitTimeout) -> Result<Value> {
        match task {
            Some(task) => Ok(self.monitor.wait_for_task(&task, timeout)?.into_value()),
            None => Ok(body),
        }
    }
}

fn require_resource(resource: &Value) -> Result<()> {
    let missing = match resource {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if missing {
        return Err(OneViewError::InvalidArgument(
            MSG_RESOURCE_NOT_PROVIDED.to_string(),
        ));
    }
    Ok(())
}
