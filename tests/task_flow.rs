//! End-to-end tests for asynchronous operations
//!
//! Drives the resource wrappers and the task monitor through the public API
//! against a scripted appliance and a manual clock.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use oneview::connection::{Connection, Method, ScriptedConnection};
use oneview::error::{OneViewError, TransientKind};
use oneview::resources::{EthernetNetworks, FcNetworks, IdPoolsRanges, ResourceClient};
use oneview::tasks::{ManualClock, Task, TaskMonitor, TaskOutcome, WaitTimeout};
use serde_json::{json, Value};

struct Appliance {
    conn: Arc<ScriptedConnection>,
    clock: Arc<ManualClock>,
    monitor: TaskMonitor,
}

impl Appliance {
    fn new() -> Self {
        let conn = Arc::new(ScriptedConnection::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let shared: Arc<dyn Connection> = conn.clone();
        let monitor = TaskMonitor::new(shared).with_clock(clock.clone());
        Self {
            conn,
            clock,
            monitor,
        }
    }

    fn client(&self, uri: &str) -> ResourceClient {
        let shared: Arc<dyn Connection> = self.conn.clone();
        ResourceClient::new(shared, uri).with_monitor(self.monitor.clone())
    }

    /// Script a task that runs for `running_polls` polls and then finishes as `last`.
    fn script_task(&self, uri: &str, running_polls: usize, last: Value) {
        for _ in 0..running_polls {
            self.conn.on_get(
                uri,
                json!({"uri": uri, "taskState": "Running", "computedPercentComplete": 50}),
            );
        }
        self.conn.on_get(uri, last);
    }
}

#[test]
fn test_create_ethernet_network_end_to_end() {
    let appliance = Appliance::new();
    let networks = EthernetNetworks::with_client(appliance.client(EthernetNetworks::URI));
    let task_uri = "/rest/tasks/E1";
    appliance.conn.on_write(
        Method::Post,
        EthernetNetworks::URI,
        Some(Task::from(task_uri)),
        json!({}),
    );
    appliance.script_task(
        task_uri,
        3,
        json!({
            "uri": task_uri,
            "category": "tasks",
            "type": "TaskResourceV2",
            "name": "Create",
            "taskState": "Completed",
            "associatedResource": {"resourceUri": "/rest/ethernet-networks/n1"}
        }),
    );
    appliance
        .conn
        .on_get("/rest/ethernet-networks/n1", json!({"name": "prod", "vlanId": 100}));

    let created = networks
        .create(&json!({"name": "prod", "vlanId": 100}), WaitTimeout::Seconds(60))
        .unwrap();

    assert_eq!(created["name"], "prod");
    assert_eq!(
        appliance.clock.sleeps(),
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(3)
        ]
    );
}

#[test]
fn test_delete_fc_network_returns_true() {
    let appliance = Appliance::new();
    let networks = FcNetworks::with_client(appliance.client(FcNetworks::URI));
    let task_uri = "/rest/tasks/D1";
    appliance.conn.on_write(
        Method::Delete,
        "/rest/fc-networks/f1",
        Some(Task::from(task_uri)),
        Value::Null,
    );
    appliance.script_task(
        task_uri,
        1,
        json!({
            "uri": task_uri,
            "type": "TaskResourceV2",
            "name": "Delete",
            "taskState": "Completed",
            "associatedResource": {"resourceUri": "/rest/fc-networks/f1"}
        }),
    );

    let deleted = networks
        .delete("f1", false, FcNetworks::DEFAULT_TIMEOUT)
        .unwrap();

    assert_eq!(deleted, Value::Bool(true));
    assert_eq!(
        appliance.conn.calls_to(Method::Get, "/rest/fc-networks/f1"),
        0
    );
}

#[test]
fn test_failed_task_surfaces_error_code() {
    let appliance = Appliance::new();
    let ranges = IdPoolsRanges::new("vmac", appliance.conn.clone())
        .unwrap()
        .with_client(appliance.client("/rest/id-pools/vmac/ranges"));
    let task_uri = "/rest/tasks/R1";
    appliance.conn.on_write(
        Method::Post,
        "/rest/id-pools/vmac/ranges",
        Some(Task::from(task_uri)),
        json!({}),
    );
    appliance.script_task(
        task_uri,
        2,
        json!({
            "uri": task_uri,
            "taskState": "Error",
            "taskErrors": [{"message": "Range overlaps", "errorCode": "RANGE_OVERLAP"}]
        }),
    );

    let err = ranges
        .create(&json!({"type": "Range", "startAddress": "A"}), WaitTimeout::Unlimited)
        .unwrap_err();

    assert_eq!(err.to_string(), "Range overlaps");
    assert_eq!(err.error_code(), Some("RANGE_OVERLAP"));
}

#[test]
fn test_wait_survives_short_outage() {
    let appliance = Appliance::new();
    let task_uri = "/rest/tasks/O1";
    appliance
        .conn
        .on_get(task_uri, json!({"uri": task_uri, "taskState": "Running"}))
        .on_get_error(task_uri, TransientKind::ConnectionReset)
        .on_get_error(task_uri, TransientKind::Timeout)
        .on_get_error(task_uri, TransientKind::ConnectionRefused)
        .on_get(
            task_uri,
            json!({"uri": task_uri, "type": "Background", "taskState": "Completed"}),
        );

    let outcome = appliance
        .monitor
        .wait_for_task(&Task::from(task_uri), WaitTimeout::Unlimited)
        .unwrap();

    match outcome {
        TaskOutcome::Task(task) => assert_eq!(task.task_state.as_deref(), Some("Completed")),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_wait_gives_up_after_long_outage() {
    let appliance = Appliance::new();
    let task_uri = "/rest/tasks/O2";
    appliance
        .conn
        .on_get(task_uri, json!({"uri": task_uri, "taskState": "Running"}))
        .on_get_error(task_uri, TransientKind::Unreachable);

    let err = appliance
        .monitor
        .wait_for_task(&Task::from(task_uri), WaitTimeout::Unlimited)
        .unwrap_err();

    assert!(matches!(
        err,
        OneViewError::TransientIo {
            kind: TransientKind::Unreachable,
            ..
        }
    ));
    // The window is 90 seconds: 1 + 2 + ... + 10 = 55, then 10 per poll past 90.
    let slept: u64 = appliance.clock.sleeps().iter().map(Duration::as_secs).sum();
    assert!(slept > 90);
    assert!(slept <= 90 + 10 + 1);
}

#[test]
fn test_backup_resolves_task_of_record() {
    let appliance = Appliance::new();
    let backup = Task::from_value(json!({
        "category": "backups",
        "type": "BACKUP",
        "taskUri": "/rest/tasks/B1",
        "uri": "/rest/backups/b1"
    }))
    .unwrap();
    appliance.conn.on_get(
        "/rest/tasks/B1",
        json!({
            "uri": "/rest/tasks/B1",
            "category": "tasks",
            "type": "TaskResourceV2",
            "associatedResource": {"resourceUri": "/rest/backups/b1"}
        }),
    );
    appliance
        .conn
        .on_get("/rest/backups/b1", json!({"id": "b1", "status": "SUCCEEDED"}));

    let (task, entity) = appliance.monitor.get_associated_resource(&backup).unwrap();

    assert_eq!(task.uri.as_deref(), Some("/rest/tasks/B1"));
    assert_eq!(entity.into_value()["status"], "SUCCEEDED");
    assert_eq!(appliance.conn.calls()[0].uri, "/rest/tasks/B1");
}

#[test]
fn test_timeout_reports_requested_seconds() {
    let appliance = Appliance::new();
    let task_uri = "/rest/tasks/T1";
    appliance
        .conn
        .on_get(task_uri, json!({"uri": task_uri, "taskState": "Pending"}));

    let err = appliance
        .monitor
        .get_completed_task(&Task::from(task_uri), WaitTimeout::Seconds(30))
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Waited 30 seconds for task to complete, aborting"
    );
}
