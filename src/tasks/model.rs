//! Task documents as returned by the appliance.
//!
//! Only the fields the monitor reasons about are typed; everything else is
//! carried in `extra` so a task round-trips back to the caller unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Task states that mean the server is still working on the task.
pub const RUNNING_STATES: [&str; 6] = [
    "New", "Starting", "Pending", "Running", "Suspended", "Stopping",
];

/// The only terminal state reported back as a failure.
pub const ERROR_STATE: &str = "Error";

/// Operation names whose successful completion yields `true` instead of an entity.
pub const DELETED_TASK_NAMES: [&str; 4] = [
    "Delete",
    "Remove",
    "Remove SAN manager",
    "Delete server hardware type",
];

pub const TASKS_CATEGORY: &str = "tasks";
pub const BACKUPS_CATEGORY: &str = "backups";
pub const TASK_RESOURCE_TYPE: &str = "TaskResourceV2";
pub const BACKUP_TYPE: &str = "BACKUP";

/// Classification of a task's `taskState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    Running,
    Failed,
    Finished,
}

impl TaskPhase {
    pub fn from_state(state: Option<&str>) -> Self {
        match state {
            Some(state) if RUNNING_STATES.contains(&state) => TaskPhase::Running,
            Some(ERROR_STATE) => TaskPhase::Failed,
            _ => TaskPhase::Finished,
        }
    }
}

/// How the associated resource of a task is located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// `category = "tasks"`, `type = "TaskResourceV2"`
    TaskResource,
    /// `category = "backups"`, `type = "BACKUP"`; the real task lives at `taskUri`
    Backup,
    /// Known category carrying a type this client does not understand
    UnrecognizedType { task_type: String },
    /// Category outside `tasks`/`backups`, or missing
    UnknownCategory { category: Option<String> },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociatedResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_uri: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A server-side asynchronous operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_resource: Option<AssociatedResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_errors: Option<Vec<TaskErrorDetail>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_percent_complete: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Value {
        // A struct of options and JSON maps always serializes.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// A task with no fields at all carries nothing to poll or resolve.
    pub fn is_empty(&self) -> bool {
        *self == Task::default()
    }

    pub fn phase(&self) -> TaskPhase {
        TaskPhase::from_state(self.task_state.as_deref())
    }

    pub fn is_running(&self) -> bool {
        self.phase() == TaskPhase::Running
    }

    pub fn is_delete_like(&self) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| DELETED_TASK_NAMES.contains(&name))
    }

    pub fn kind(&self) -> TaskKind {
        match self.category.as_deref() {
            Some(TASKS_CATEGORY) | Some(BACKUPS_CATEGORY) => {
                match self.task_type.as_deref() {
                    Some(TASK_RESOURCE_TYPE) => TaskKind::TaskResource,
                    Some(BACKUP_TYPE) => TaskKind::Backup,
                    other => TaskKind::UnrecognizedType {
                        task_type: other.unwrap_or_default().to_string(),
                    },
                }
            }
            other => TaskKind::UnknownCategory {
                category: other.map(str::to_string),
            },
        }
    }

    pub fn associated_resource_uri(&self) -> Option<&str> {
        self.associated_resource
            .as_ref()
            .and_then(|resource| resource.resource_uri.as_deref())
            .filter(|uri| !uri.is_empty())
    }

    pub fn first_error(&self) -> Option<&TaskErrorDetail> {
        self.task_errors.as_ref().and_then(|errors| errors.first())
    }

    /// Message and vendor code describing why a task ended in `Error`.
    pub fn failure_detail(&self) -> (String, Option<String>) {
        let first = self.first_error();
        let error_code = first.and_then(|err| err.error_code.clone());

        if let Some(message) = first.and_then(|err| err.message.clone()) {
            return (message, error_code);
        }
        if let Some(status) = self.task_status.as_deref().filter(|s| !s.is_empty()) {
            return (status.to_string(), error_code);
        }
        (
            crate::error::MSG_UNKNOWN_EXCEPTION.to_string(),
            error_code,
        )
    }
}

impl TryFrom<Value> for Task {
    type Error = crate::error::OneViewError;

    fn try_from(value: Value) -> Result<Self> {
        Task::from_value(value)
    }
}

impl From<&str> for Task {
    /// Reference a task by URI only; the monitor fetches the rest.
    fn from(uri: &str) -> Self {
        Task {
            uri: Some(uri.to_string()),
            ..Task::default()
        }
    }
}
