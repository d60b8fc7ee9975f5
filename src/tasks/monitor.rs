//! Polling and resolution of appliance tasks.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use super::backoff::{poll_interval, ConnectionFailureControl, CONNECTION_FAILURE_TIMEOUT};
use super::clock::{Clock, SystemClock};
use super::model::{Task, TaskKind, TaskPhase};
use crate::connection::Connection;
use crate::error::{OneViewError, Result};

/// Path segment of support dump artifacts. They are binary downloads, not JSON documents.
pub const SUPPORT_DUMPS_SEGMENT: &str = "/support-dumps/";

/// Deadline for a blocking wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitTimeout {
    #[default]
    Unlimited,
    Seconds(u64),
}

impl From<i64> for WaitTimeout {
    /// Negative values (the API's `-1`) mean "wait forever".
    fn from(seconds: i64) -> Self {
        u64::try_from(seconds)
            .map(WaitTimeout::Seconds)
            .unwrap_or(WaitTimeout::Unlimited)
    }
}

impl From<Option<u64>> for WaitTimeout {
    fn from(seconds: Option<u64>) -> Self {
        seconds.map_or(WaitTimeout::Unlimited, WaitTimeout::Seconds)
    }
}

/// The thing a finished task acted upon.
#[derive(Debug, Clone, PartialEq)]
pub enum AssociatedEntity {
    Document(Value),
    /// URI of a binary artifact such as a support dump
    Artifact(String),
}

impl AssociatedEntity {
    pub fn into_value(self) -> Value {
        match self {
            AssociatedEntity::Document(document) => document,
            AssociatedEntity::Artifact(uri) => Value::String(uri),
        }
    }
}

/// What a successful wait hands back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// A delete-like operation finished; there is nothing left to fetch.
    Deleted,
    Entity(AssociatedEntity),
    /// The task did not name a resource; the final task document itself.
    Task(Task),
}

impl TaskOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, TaskOutcome::Deleted)
    }

    /// JSON view of the outcome; `Deleted` becomes `true`.
    pub fn into_value(self) -> Value {
        match self {
            TaskOutcome::Deleted => Value::Bool(true),
            TaskOutcome::Entity(entity) => entity.into_value(),
            TaskOutcome::Task(task) => task.to_value(),
        }
    }
}

/// Watches asynchronous operations through a shared [`Connection`].
///
/// Holds no per-task state: every wait creates its own
/// [`ConnectionFailureControl`], so one monitor may serve many waits.
#[derive(Clone)]
pub struct TaskMonitor {
    connection: Arc<dyn Connection>,
    clock: Arc<dyn Clock>,
    connection_failure_timeout: Duration,
}

impl TaskMonitor {
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self {
            connection,
            clock: Arc::new(SystemClock),
            connection_failure_timeout: CONNECTION_FAILURE_TIMEOUT,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_connection_failure_timeout(mut self, timeout: Duration) -> Self {
        self.connection_failure_timeout = timeout;
        self
    }

    pub fn connection_failure_timeout(&self) -> Duration {
        self.connection_failure_timeout
    }

    /// Start a failure-control record for a new polling loop.
    pub fn failure_control(&self) -> ConnectionFailureControl {
        ConnectionFailureControl::new(self.clock.now())
    }

    /// Fetch the current document of `task`.
    pub fn get(&self, task: &Task) -> Result<Task> {
        let uri = task_uri(task)?;
        Task::from_value(self.connection.get(uri)?)
    }

    /// Check whether the server is still working on `task`.
    ///
    /// Without a failure control any fetch error propagates. With one,
    /// transient network errors are reported as "still running" until the
    /// tolerance window since the last successful fetch runs out.
    pub fn is_task_running(
        &self,
        task: &Task,
        failure_control: Option<&mut ConnectionFailureControl>,
    ) -> Result<bool> {
        let uri = task_uri(task)?;

        let err = match self.connection.get(uri).and_then(Task::from_value) {
            Ok(current) => {
                if let Some(control) = failure_control {
                    control.record_success(self.clock.now());
                }
                let percent_complete = current
                    .computed_percent_complete
                    .clone()
                    .unwrap_or(Value::Null);
                debug!(
                    uri,
                    state = current.task_state.as_deref().unwrap_or("unknown"),
                    percent_complete = %percent_complete,
                    "polled task"
                );
                return Ok(current.phase() == TaskPhase::Running);
            }
            Err(err) => err,
        };

        error!(uri, error = %err, "failed to fetch task state");
        let Some(control) = failure_control else {
            return Err(err);
        };

        if err.is_transient()
            && control.within_tolerance(self.clock.now(), self.connection_failure_timeout)
        {
            warn!(
                uri,
                last_success = %control.last_success,
                "network instability while polling, assuming the task is still running"
            );
            return Ok(true);
        }
        Err(err)
    }

    /// Block until `task` finishes, then classify it and resolve its result.
    pub fn wait_for_task(&self, task: &Task, timeout: WaitTimeout) -> Result<TaskOutcome> {
        self.wait_task_completion(task, timeout)?;

        let task = self.get(task)?;
        debug!(
            uri = task.uri.as_deref().unwrap_or_default(),
            state = task.task_state.as_deref().unwrap_or("unknown"),
            "task finished"
        );
        self.task_response(task)
    }

    /// Block until `task` finishes and return its final document unclassified.
    pub fn get_completed_task(&self, task: &Task, timeout: WaitTimeout) -> Result<Task> {
        self.wait_task_completion(task, timeout)?;
        self.get(task)
    }

    /// Resolve the entity a finished task acted upon.
    ///
    /// For backups the returned task is the task of record found at
    /// `taskUri`, not the backup pointer that was passed in.
    pub fn get_associated_resource(&self, task: &Task) -> Result<(Task, AssociatedEntity)> {
        if task.is_empty() {
            return Err(OneViewError::InvalidTask);
        }

        match task.kind() {
            TaskKind::UnknownCategory { .. } => Err(OneViewError::unknown_object_type()),
            TaskKind::UnrecognizedType { task_type } => {
                Err(OneViewError::UnrecognizedTaskType(task_type))
            }
            TaskKind::TaskResource => match task.associated_resource_uri() {
                Some(uri) if uri.contains(SUPPORT_DUMPS_SEGMENT) => {
                    Ok((task.clone(), AssociatedEntity::Artifact(uri.to_string())))
                }
                resource_uri => {
                    let entity = self.fetch_entity(resource_uri)?;
                    Ok((task.clone(), entity))
                }
            },
            TaskKind::Backup => {
                let backup_task_uri = task
                    .task_uri
                    .as_deref()
                    .filter(|uri| !uri.is_empty())
                    .ok_or(OneViewError::InvalidTask)?;
                let inner = Task::from_value(self.connection.get(backup_task_uri)?)?;

                let resource_uri = inner
                    .associated_resource_uri()
                    .or(inner.uri.as_deref())
                    .map(str::to_string);
                let entity = self.fetch_entity(resource_uri.as_deref())?;
                Ok((inner, entity))
            }
        }
    }

    fn fetch_entity(&self, uri: Option<&str>) -> Result<AssociatedEntity> {
        let document = match uri {
            Some(uri) => self.connection.get(uri)?,
            None => Value::Object(Map::new()),
        };
        Ok(AssociatedEntity::Document(document))
    }

    fn wait_task_completion(&self, task: &Task, timeout: WaitTimeout) -> Result<()> {
        if task.is_empty() {
            return Err(OneViewError::InvalidTask);
        }

        debug!(uri = task.uri.as_deref().unwrap_or_default(), "waiting for task completion");
        let start = self.clock.now();
        let mut control = ConnectionFailureControl::new(start);
        let mut polls: u32 = 0;

        while self.is_task_running(task, Some(&mut control))? {
            polls = polls.saturating_add(1);
            self.clock.sleep(poll_interval(polls));

            if let WaitTimeout::Seconds(limit) = timeout {
                let elapsed = self.clock.now().signed_duration_since(start);
                let exceeded = i64::try_from(limit)
                    .ok()
                    .and_then(chrono::Duration::try_seconds)
                    .is_some_and(|limit| elapsed > limit);
                if exceeded {
                    return Err(OneViewError::Timeout { timeout: limit });
                }
            }
        }
        Ok(())
    }

    fn task_response(&self, task: Task) -> Result<TaskOutcome> {
        if task.phase() == TaskPhase::Failed {
            let (message, error_code) = task.failure_detail();
            return Err(OneViewError::TaskError {
                message,
                error_code,
            });
        }

        if task.is_delete_like() {
            return Ok(TaskOutcome::Deleted);
        }

        let names_resource = task
            .task_type
            .as_deref()
            .is_some_and(|task_type| task_type.starts_with("Task"))
            && task.name.is_some();
        if names_resource {
            let (_, entity) = self.get_associated_resource(&task)?;
            return Ok(TaskOutcome::Entity(entity));
        }

        warn!(
            uri = task.uri.as_deref().unwrap_or_default(),
            "task completed with no resource to resolve, returning the task"
        );
        Ok(TaskOutcome::Task(task))
    }
}

fn task_uri(task: &Task) -> Result<&str> {
    if task.is_empty() {
        return Err(OneViewError::InvalidTask);
    }
    task.uri
        .as_deref()
        .filter(|uri| !uri.is_empty())
        .ok_or(OneViewError::InvalidTask)
}
