//! Ethernet networks.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::connection::{Connection, TaskAndBody};
use crate::error::Result;
use crate::resources::{merge_defaults, CollectionQuery, DeleteTarget, ResourceClient};
use crate::tasks::WaitTimeout;

pub struct EthernetNetworks {
    client: ResourceClient,
    defaults: Value,
}

impl EthernetNetworks {
    pub const URI: &'static str = "/rest/ethernet-networks";

    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self::with_client(ResourceClient::new(connection, Self::URI))
    }

    pub fn with_client(client: ResourceClient) -> Self {
        Self {
            client,
            defaults: json!({
                "ethernetNetworkType": "Tagged",
                "type": "ethernet-networkV3"
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

    /// Case-insensitive match on `field`.
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

    /// URIs of the server profiles using the network.
    pub fn get_associated_profiles(&self, id: &str) -> Result<Value> {
        self.client
            .get(&format!("{}/{id}/associatedProfiles", Self::URI))
    }

    /// URIs of the uplink sets carrying the network.
    pub fn get_associated_uplink_groups(&self, id: &str) -> Result<Value> {
        self.client
            .get(&format!("{}/{id}/associatedUplinkGroups", Self::URI))
    }
}
