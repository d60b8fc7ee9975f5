//! Fibre Channel networks.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::connection::{Connection, TaskAndBody};
use crate::error::Result;
use crate::resources::{merge_defaults, CollectionQuery, DeleteTarget, ResourceClient};
use crate::tasks::WaitTimeout;

pub struct FcNetworks {
    client: ResourceClient,
    defaults: Value,
}

impl FcNetworks {
    pub const URI: &'static str = "/rest/fc-networks";

    /// Wait used by `create` and `update` when the caller has no preference.
    pub const DEFAULT_TIMEOUT: WaitTimeout = WaitTimeout::Seconds(60);

    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self::with_client(ResourceClient::new(connection, Self::URI))
    }

    pub fn with_client(client: ResourceClient) -> Self {
        Self {
            client,
            defaults: json!({
                "autoLoginRedistribution": false,
                "type": "fc-networkV2",
                "linkStabilityTime": 30,
                "fabricType": "FabricAttach"
            }),
        }
    }

    pub fn client(&self) -> &ResourceClient {
        &self.client
    }

    pub fn get_all(&self, query: &CollectionQuery) -> Result<Vec<Value>> {
        self.client.get_all(query)
    }

    pub fn get(&self, id_or_uri: &str) -> Result<Value> {
        self.client.get(id_or_uri)
    }

    pub fn get_by(&self, field: &str, value: &str) -> Result<Vec<Value>> {
        self.client.get_by(field, value)
    }

    pub fn create(&self, resource: &Value, timeout: WaitTimeout) -> Result<Value> {
        self.client
            .create(&merge_defaults(&self.defaults, resource), timeout)
    }

    pub fn create_async(&self, resource: &Value) -> Result<TaskAndBody> {
        self.client
            .create_async(&merge_defaults(&self.defaults, resource))
    }

    pub fn update(&self, resource: &Value, timeout: WaitTimeout) -> Result<Value> {
        self.client
            .update(&merge_defaults(&self.defaults, resource), None, timeout)
    }

    pub fn update_async(&self, resource: &Value) -> Result<TaskAndBody> {
        self.client
            .update_async(&merge_defaults(&self.defaults, resource), None)
    }

    pub fn delete<'a>(
        &self,
        target: impl Into<DeleteTarget<'a>>,
        force: bool,
        timeout: WaitTimeout,
    ) -> Result<Value> {
        self.client.delete(target, force, timeout)
    }
}
