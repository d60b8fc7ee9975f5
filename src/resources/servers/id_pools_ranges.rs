//! Ranges of virtual serial numbers, WWNs and MAC addresses.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use crate::connection::Connection;
use crate::error::{OneViewError, Result};
use crate::resources::{DeleteTarget, ResourceClient};
use crate::tasks::WaitTimeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPoolType {
    /// Virtual serial numbers
    Vsn,
    /// Virtual World Wide Names
    Vwwn,
    /// Virtual MAC addresses
    Vmac,
}

impl IdPoolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdPoolType::Vsn => "vsn",
            IdPoolType::Vwwn => "vwwn",
            IdPoolType::Vmac => "vmac",
        }
    }
}

impl fmt::Display for IdPoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdPoolType {
    type Err = OneViewError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "vsn" => Ok(IdPoolType::Vsn),
            "vwwn" => Ok(IdPoolType::Vwwn),
            "vmac" => Ok(IdPoolType::Vmac),
            other => Err(OneViewError::InvalidArgument(format!(
                "Invalid type: {other}, types allowed: vmac, vsn, vwwn"
            ))),
        }
    }
}

pub struct IdPoolsRanges {
    client: ResourceClient,
    pool_type: IdPoolType,
}

impl IdPoolsRanges {
    /// `pool_type` must be one of `vsn`, `vwwn` or `vmac`.
    pub fn new(pool_type: &str, connection: Arc<dyn Connection>) -> Result<Self> {
        let pool_type: IdPoolType = pool_type.parse()?;
        Ok(Self {
            client: ResourceClient::new(connection, Self::collection_uri(pool_type)),
            pool_type,
        })
    }

    pub fn collection_uri(pool_type: IdPoolType) -> String {
        format!("/rest/id-pools/{pool_type}/ranges")
    }

    pub fn pool_type(&self) -> IdPoolType {
        self.pool_type
    }

    pub fn client(&self) -> &ResourceClient {
        &self.client
    }

    pub fn with_client(mut self, client: ResourceClient) -> Self {
        self.client = client;
        self
    }

    pub fn create(&self, resource: &Value, timeout: WaitTimeout) -> Result<Value> {
        self.client.create(resource, timeout)
    }

    pub fn get(&self, id_or_uri: &str) -> Result<Value> {
        self.client.get(id_or_uri)
    }

    /// Enable or disable the range at `id_or_uri`.
    pub fn enable(
        &self,
        information: &Value,
        id_or_uri: &str,
        timeout: WaitTimeout,
    ) -> Result<Value> {
        let uri = self.client.build_uri(id_or_uri)?;
        self.client.update(information, Some(&uri), timeout)
    }

    /// Allocate ids from the range.
    pub fn allocate(
        &self,
        information: &Value,
        id_or_uri: &str,
        timeout: WaitTimeout,
    ) -> Result<Value> {
        let uri = format!("{}/allocator", self.client.build_uri(id_or_uri)?);
        self.client.update(information, Some(&uri), timeout)
    }

    /// Return ids to the range.
    pub fn collect(
        &self,
        information: &Value,
        id_or_uri: &str,
        timeout: WaitTimeout,
    ) -> Result<Value> {
        let uri = format!("{}/collector", self.client.build_uri(id_or_uri)?);
        self.client.update(information, Some(&uri), timeout)
    }

    /// Fragments already handed out. `count = -1` returns all of them.
    pub fn get_allocated_fragments(
        &self,
        id_or_uri: &str,
        count: i64,
        start: u64,
    ) -> Result<Vec<Value>> {
        self.fragments(id_or_uri, "allocated-fragments", count, start)
    }

    pub fn get_free_fragments(
        &self,
        id_or_uri: &str,
        count: i64,
        start: u64,
    ) -> Result<Vec<Value>> {
        self.fragments(id_or_uri, "free-fragments", count, start)
    }

    pub fn delete<'a>(
        &self,
        target: impl Into<DeleteTarget<'a>>,
        force: bool,
        timeout: WaitTimeout,
    ) -> Result<Value> {
        self.client.delete(target, force, timeout)
    }

    fn fragments(&self, id_or_uri: &str, kind: &str, count: i64, start: u64) -> Result<Vec<Value>> {
        let uri = format!(
            "{}/{kind}?start={start}&count={count}",
            self.client.build_uri(id_or_uri)?
        );
        self.client.get_collection(&uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Method, ScriptedConnection};
    use serde_json::json;

    const RANGE_ID: &str = "f0a0a113-ec97-41b4-83ce-d7c92b900e7c";

    fn setup(pool_type: &str) -> (Arc<ScriptedConnection>, IdPoolsRanges, String) {
        let conn = Arc::new(ScriptedConnection::new());
        let shared: Arc<dyn Connection> = conn.clone();
        let ranges = IdPoolsRanges::new(pool_type, shared).unwrap();
        let uri = format!("/rest/id-pools/{pool_type}/ranges/{RANGE_ID}");
        (conn, ranges, uri)
    }

    #[test]
    fn test_collection_uri_per_type() {
        for pool_type in ["vsn", "vwwn", "vmac"] {
            let (_, ranges, _) = setup(pool_type);
            assert_eq!(
                ranges.client().uri(),
                format!("/rest/id-pools/{pool_type}/ranges")
            );
        }
    }

    #[test]
    fn test_invalid_type() {
        let conn: Arc<dyn Connection> = Arc::new(ScriptedConnection::new());
        let err = IdPoolsRanges::new("invalid", conn).err().unwrap();
        assert!(matches!(err, OneViewError::InvalidArgument(_)));
    }

    #[test]
    fn test_get_by_id_and_uri() {
        let (conn, ranges, uri) = setup("vsn");
        conn.on_get(&uri, json!({"uri": uri}));

        ranges.get(RANGE_ID).unwrap();
        ranges.get(&uri).unwrap();
        assert_eq!(conn.calls_to(Method::Get, &uri), 2);
    }

    #[test]
    fn test_enable_puts_to_range() {
        let (conn, ranges, uri) = setup("vsn");
        conn.on_write(Method::Put, &uri, None, json!({"enabled": true}));

        let info = json!({"type": "Range", "enabled": true});
        let result = ranges.enable(&info, &uri, WaitTimeout::Unlimited).unwrap();

        assert_eq!(result, json!({"enabled": true}));
        assert_eq!(conn.calls()[0].body, Some(info));
    }

    #[test]
    fn test_allocate_and_collect() {
        let (conn, ranges, uri) = setup("vmac");
        let allocator = format!("{uri}/allocator");
        let collector = format!("{uri}/collector");
        conn.on_write(Method::Put, &allocator, None, json!({"count": 2}));
        conn.on_write(Method::Put, &collector, None, json!({"idList": []}));

        ranges
            .allocate(&json!({"count": 2}), &uri, WaitTimeout::Unlimited)
            .unwrap();
        ranges
            .collect(&json!({"idList": ["a"]}), RANGE_ID, WaitTimeout::Unlimited)
            .unwrap();

        assert_eq!(conn.calls_to(Method::Put, &allocator), 1);
        assert_eq!(conn.calls_to(Method::Put, &collector), 1);
    }

    #[test]
    fn test_fragments_uris() {
        let (conn, ranges, uri) = setup("vsn");
        let allocated = format!("{uri}/allocated-fragments?start=0&count=-1");
        let free = format!("{uri}/free-fragments?start=3&count=5");
        conn.on_get(&allocated, json!({"members": [{"startAddress": "a"}]}));
        conn.on_get(&free, json!({"members": []}));

        assert_eq!(ranges.get_allocated_fragments(&uri, -1, 0).unwrap().len(), 1);
        assert!(ranges.get_free_fragments(&uri, 5, 3).unwrap().is_empty());
    }

    #[test]
    fn test_delete_with_force() {
        let (conn, ranges, _) = setup("vwwn");
        conn.on_write(Method::Delete, "/rest/uri?force=True", None, Value::Null);
        let (conn2, ranges2, _) = setup("vwwn");
        conn2.on_write(Method::Delete, "/rest/uri", None, Value::Null);

        let resource = json!({"uri": "/rest/uri"});
        ranges.delete(&resource, true, WaitTimeout::Seconds(50)).unwrap();
        ranges2.delete(&resource, false, WaitTimeout::Unlimited).unwrap();

        assert_eq!(conn.calls_to(Method::Delete, "/rest/uri?force=True"), 1);
        assert_eq!(conn2.calls_to(Method::Delete, "/rest/uri"), 1);
    }
}
