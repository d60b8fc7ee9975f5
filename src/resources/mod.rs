//! REST resource clients.
//!
//! [`ResourceClient`] implements the operations shared by every collection;
//! the typed wrappers add their collection URI, creation defaults and the
//! few endpoints specific to them.

mod client;
pub mod networking;
pub mod servers;


pub use client::{
    CollectionQuery, DeleteTarget, ResourceClient, UtilizationQuery, MSG_INVALID_FIELD,
    MSG_INVALID_ID, MSG_RESOURCE_NOT_PROVIDED, MSG_RESOURCE_URI_NOT_PROVIDED,
};
pub use networking::{EthernetNetworks, FcNetworks};
pub use servers::{IdPoolType, IdPoolsRanges};

use serde_json::Value;

/// Overlay `resource` on top of `defaults`; caller-supplied fields win.
///
/// Non-object resources are returned unchanged.
pub fn merge_defaults(defaults: &Value, resource: &Value) -> Value {
    match (defaults, resource) {
        (Value::Object(defaults), Value::Object(fields)) => {
            let mut merged = defaults.clone();
            for (key, value) in fields {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        _ => resource.clone(),
    }
}
