//! Types for the Aurora task-center API
//!
//! Field names are part of the wire contract with the service and are
//! preserved exactly, including the PascalCase spelling.

use crate::error::{ClientError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Advisory durations stamped onto continuation requests. The service
/// validates their ranges but drives the actual batch from the original
/// submission, so fixed mid-range values are used.
const CONTINUATION_TIMEOUT_MS: u32 = 800;
const CONTINUATION_SLEEP_MS: u32 = 50;
const CONTINUATION_CONCURRENCY: u8 = 5;

/// Client configuration
#[derive(Debug, Clone)]
pub struct AuroraConfig {
    /// Login endpoint URL
    pub login_url: String,
    /// Task submission endpoint URL
    pub tasks_url: String,
    /// Poll (touch) endpoint URL
    pub touch_url: String,
    /// Account name for authentication
    pub name: String,
    /// Account password for authentication
    pub password: String,
    /// Per-request transport timeout in seconds (default: 10)
    pub timeout_secs: u64,
    /// Fixed interval between touch attempts in milliseconds (default: 10).
    /// Independent of the `SleepDuration` carried in the request payload,
    /// which the service interprets on its side.
    pub poll_interval_ms: u64,
    /// Overall poll deadline. `None` derives one from the request's
    /// advisory `TimeoutDuration`.
    pub poll_deadline: Option<Duration>,
}

impl Default for AuroraConfig {
    fn default() -> Self {
        Self {
            login_url: "http://localhost/auth".to_string(),
            tasks_url: "http://localhost/tasks/send".to_string(),
            touch_url: "http://localhost/tasks/touch".to_string(),
            name: String::new(),
            password: String::new(),
            timeout_secs: 10,
            poll_interval_ms: 10,
            poll_deadline: None,
        }
    }
}

/// Login request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthRequest {
    /// Account name
    pub name: String,
    /// Account password
    pub password: String,
}

/// Login response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthResponse {
    /// Human-readable status message
    #[serde(default)]
    pub message: String,
    /// Account name echoed back
    #[serde(default)]
    pub name: String,
    /// Account UUID assigned by the service
    #[serde(rename = "UUID", default)]
    pub uuid: String,
}

/// Task composition kind
///
/// Closed set; the extraction rules for continuations are exhaustive over
/// these variants rather than comparing wire strings ad hoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// A single task
    Task,
    /// Independent tasks executed in parallel
    Group,
    /// Tasks executed in order, each feeding the next
    Chain,
    /// A group followed by a callback receiving all group results
    Chord,
}

impl Default for TaskKind {
    fn default() -> Self {
        TaskKind::Task
    }
}

/// Headers directing a task inside the service
pub type Headers = serde_json::Map<String, Value>;

/// One typed task argument
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Arg {
    /// Optional argument name
    #[serde(default)]
    pub name: String,
    /// Type tag interpreted by the worker (e.g. "int64", "string")
    #[serde(rename = "Type", default)]
    pub arg_type: String,
    /// The value itself
    #[serde(default)]
    pub value: Value,
}

impl Arg {
    /// Create an argument from a type tag and value.
    pub fn new(arg_type: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: String::new(),
            arg_type: arg_type.into(),
            value: value.into(),
        }
    }
}

/// A single task invocation descriptor
///
/// Signatures are opaque payloads interpreted by the service; the client
/// never executes them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Signature {
    /// Task UUID assigned by the service
    #[serde(rename = "UUID", default)]
    pub uuid: String,
    /// Registered task name
    #[serde(default)]
    pub name: String,
    /// Routing key for broker dispatch
    #[serde(default)]
    pub routing_key: String,
    /// Earliest execution time
    #[serde(rename = "ETA", default)]
    pub eta: Option<DateTime<Utc>>,
    /// Group this signature belongs to
    #[serde(rename = "GroupUUID", default)]
    pub group_uuid: String,
    /// Number of tasks in the group
    #[serde(default)]
    pub group_task_count: i32,
    /// Typed arguments
    #[serde(default, deserialize_with = "null_default")]
    pub args: Vec<Arg>,
    /// Broker headers
    #[serde(default, deserialize_with = "null_default")]
    pub headers: Headers,
    /// Priority hint
    #[serde(default)]
    pub priority: u8,
    /// Whether chained results may not be appended to the args
    #[serde(default)]
    pub immutable: bool,
    /// Retry attempts on failure
    #[serde(default)]
    pub retry_count: i32,
    /// Seconds between retries
    #[serde(default)]
    pub retry_timeout: i32,
    /// Continuations run after success
    #[serde(default, deserialize_with = "null_default")]
    pub on_success: Vec<Signature>,
    /// Continuations run after failure
    #[serde(default, deserialize_with = "null_default")]
    pub on_error: Vec<Signature>,
    /// Callback for the enclosing chord
    #[serde(default)]
    pub chord_callback: Option<Box<Signature>>,
    /// Message group id passed through to the broker (e.g. SQS)
    #[serde(default)]
    pub broker_message_group_id: String,
    /// Receipt handle of the broker message
    #[serde(rename = "SQSReceiptHandle", default)]
    pub sqs_receipt_handle: String,
    /// Keep failed messages in the source queue so the broker can move
    /// them to a dead-letter queue
    #[serde(default)]
    pub stop_task_deletion_on_error: bool,
    /// Drop the task instead of requeueing when no handler is registered
    #[serde(default)]
    pub ignore_when_task_not_registered: bool,
}

impl Signature {
    /// Create a signature for a named task with no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append a typed argument.
    pub fn with_arg(mut self, arg_type: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.push(Arg::new(arg_type, value));
        self
    }
}

/// A composite unit of work submitted to the service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CenterRequest {
    /// Account UUID
    #[serde(rename = "UUID", default)]
    pub uuid: String,
    /// Account name
    #[serde(default)]
    pub user: String,
    /// Unique id for the batch; assigned by the service on first submit
    #[serde(rename = "BatchID", default)]
    pub batch_id: String,
    /// Submission time, Unix seconds
    pub timestamp: i64,
    /// Composition kind
    pub task_type: TaskKind,
    /// Ordered task signatures; must be non-empty
    #[serde(default, deserialize_with = "null_default")]
    pub signatures: Vec<Signature>,
    /// Advisory completeness timeout in milliseconds (100..=5000),
    /// interpreted by the service
    pub timeout_duration: u32,
    /// Advisory poll interval in milliseconds (50..=500), interpreted by
    /// the service
    pub sleep_duration: u32,
    /// Fan-out hint for the service (0..=10)
    #[serde(default)]
    pub send_concurrency: u8,
    /// Chord callback; required for `chord`, forbidden otherwise
    #[serde(default)]
    pub call_back: Option<Signature>,
}

impl CenterRequest {
    /// Create a request with a fresh timestamp and mid-range advisory
    /// durations.
    pub fn new(task_type: TaskKind, signatures: Vec<Signature>) -> Self {
        Self {
            uuid: String::new(),
            user: String::new(),
            batch_id: String::new(),
            timestamp: Utc::now().timestamp(),
            task_type,
            signatures,
            timeout_duration: 1000,
            sleep_duration: 100,
            send_concurrency: 0,
            call_back: None,
        }
    }

    /// Set the chord callback.
    pub fn with_call_back(mut self, call_back: Signature) -> Self {
        self.call_back = Some(call_back);
        self
    }

    /// Set the fan-out hint.
    pub fn with_concurrency(mut self, send_concurrency: u8) -> Self {
        self.send_concurrency = send_concurrency;
        self
    }

    /// Check the invariants the service validates, before paying for a
    /// round trip.
    pub fn validate(&self) -> Result<()> {
        if self.signatures.is_empty() {
            return Err(ClientError::InvalidRequest(
                "at least one signature is required".into(),
            ));
        }
        if !(100..=5000).contains(&self.timeout_duration) {
            return Err(ClientError::InvalidRequest(format!(
                "TimeoutDuration {} out of range 100..=5000 ms",
                self.timeout_duration
            )));
        }
        if !(50..=500).contains(&self.sleep_duration) {
            return Err(ClientError::InvalidRequest(format!(
                "SleepDuration {} out of range 50..=500 ms",
                self.sleep_duration
            )));
        }
        if self.send_concurrency > 10 {
            return Err(ClientError::InvalidRequest(format!(
                "SendConcurrency {} out of range 0..=10",
                self.send_concurrency
            )));
        }
        match (self.task_type, &self.call_back) {
            (TaskKind::Chord, None) => Err(ClientError::InvalidRequest(
                "chord requests require a CallBack signature".into(),
            )),
            (kind, Some(_)) if kind != TaskKind::Chord => Err(ClientError::InvalidRequest(
                format!("CallBack is only valid for chord requests, not {:?}", kind),
            )),
            _ => Ok(()),
        }
    }
}

/// Per-task-group result carried in a response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskResponse {
    /// Result values; empty until the task group finishes
    #[serde(default, deserialize_with = "null_default")]
    pub results: Vec<Value>,
    /// The signatures that produced (or will produce) the results
    #[serde(default, deserialize_with = "null_default")]
    pub signatures: Vec<Signature>,
    /// Chord callback attached to this group
    #[serde(default)]
    pub call_back: Option<Signature>,
}

/// Response to a submit or touch request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CenterResponse {
    /// Account UUID
    #[serde(rename = "UUID", default)]
    pub uuid: String,
    /// Account name
    #[serde(default)]
    pub user: String,
    /// Batch id assigned by the service
    #[serde(rename = "BatchID", default)]
    pub batch_id: String,
    /// Response time, Unix seconds
    #[serde(default)]
    pub timestamp: i64,
    /// Composition kind of the batch
    #[serde(default)]
    pub task_type: TaskKind,
    /// Per-task-group results
    #[serde(default, deserialize_with = "null_default")]
    pub task_responses: Vec<TaskResponse>,
}

impl CenterResponse {
    /// Whether every task group has produced results. A response with any
    /// empty result list is still in flight.
    pub fn is_complete(&self) -> bool {
        self.task_responses.iter().all(|t| !t.results.is_empty())
    }

    /// Derive the follow-up request that polls this partial batch.
    ///
    /// The batch id is preserved; signatures come from all task responses
    /// for a `group` (per-response order, then response order) and from the
    /// first task response otherwise. The callback is carried only for a
    /// `chord`.
    pub fn continuation(&self) -> Result<CenterRequest> {
        let first = self.task_responses.first().ok_or_else(|| {
            ClientError::InvalidResponse(format!(
                "partial response for batch {} has no task responses",
                self.batch_id
            ))
        })?;

        let signatures = match self.task_type {
            TaskKind::Group => self
                .task_responses
                .iter()
                .flat_map(|t| t.signatures.iter().cloned())
                .collect(),
            _ => first.signatures.clone(),
        };

        let call_back = match self.task_type {
            TaskKind::Chord => first.call_back.clone(),
            _ => None,
        };

        Ok(CenterRequest {
            uuid: self.uuid.clone(),
            user: self.user.clone(),
            batch_id: self.batch_id.clone(),
            timestamp: Utc::now().timestamp(),
            task_type: self.task_type,
            signatures,
            timeout_duration: CONTINUATION_TIMEOUT_MS,
            sleep_duration: CONTINUATION_SLEEP_MS,
            send_concurrency: CONTINUATION_CONCURRENCY,
            call_back,
        })
    }
}

/// The service marshals empty lists and maps as `null`.
fn null_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn add(a: i64, b: i64) -> Signature {
        Signature::new("add")
            .with_arg("int64", a)
            .with_arg("int64", b)
    }

    #[test]
    fn test_request_round_trip() {
        let request = CenterRequest {
            uuid: "u-1".into(),
            user: "admin".into(),
            batch_id: "batch-42".into(),
            timestamp: 1700000000,
            task_type: TaskKind::Chord,
            signatures: vec![add(1, 1), add(5, 6)],
            timeout_duration: 800,
            sleep_duration: 50,
            send_concurrency: 2,
            call_back: Some(Signature::new("multiply")),
        };

        let encoded = serde_json::to_string(&request).unwrap();
        let decoded: CenterRequest = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.uuid, "u-1");
        assert_eq!(decoded.batch_id, "batch-42");
        assert_eq!(decoded.timestamp, 1700000000);
        assert_eq!(decoded.task_type, TaskKind::Chord);
        assert_eq!(decoded.signatures.len(), 2);
        assert_eq!(decoded.signatures[0].name, "add");
        assert_eq!(decoded.signatures[0].args[0].value, json!(1));
        assert_eq!(decoded.timeout_duration, 800);
        assert_eq!(decoded.sleep_duration, 50);
        assert_eq!(decoded.send_concurrency, 2);
        assert_eq!(decoded.call_back.unwrap().name, "multiply");
    }

    #[test]
    fn test_wire_field_names() {
        let request = CenterRequest::new(TaskKind::Task, vec![add(1, 1)]);
        let value = serde_json::to_value(&request).unwrap();
        let object = value.as_object().unwrap();

        for key in [
            "UUID",
            "User",
            "BatchID",
            "Timestamp",
            "TaskType",
            "Signatures",
            "TimeoutDuration",
            "SleepDuration",
            "SendConcurrency",
            "CallBack",
        ] {
            assert!(object.contains_key(key), "missing wire field {}", key);
        }
        assert_eq!(value["TaskType"], json!("task"));
        assert_eq!(value["Signatures"][0]["Args"][0]["Type"], json!("int64"));
    }

    #[test]
    fn test_task_kind_wire_values() {
        for (kind, tag) in [
            (TaskKind::Task, "task"),
            (TaskKind::Group, "group"),
            (TaskKind::Chain, "chain"),
            (TaskKind::Chord, "chord"),
        ] {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(tag));
            assert_eq!(serde_json::from_value::<TaskKind>(json!(tag)).unwrap(), kind);
        }
    }

    #[test]
    fn test_null_arrays_parse_as_empty() {
        let response: CenterResponse = serde_json::from_value(json!({
            "BatchID": "b",
            "TaskType": "task",
            "TaskResponses": [
                {"Results": null, "Signatures": null, "CallBack": null}
            ]
        }))
        .unwrap();

        assert_eq!(response.task_responses.len(), 1);
        assert!(response.task_responses[0].results.is_empty());
        assert!(response.task_responses[0].signatures.is_empty());
        assert!(!response.is_complete());
    }

    #[test]
    fn test_completeness_requires_all_results() {
        let mut response = CenterResponse {
            uuid: String::new(),
            user: String::new(),
            batch_id: "b".into(),
            timestamp: 0,
            task_type: TaskKind::Group,
            task_responses: vec![
                TaskResponse {
                    results: vec![json!(2)],
                    ..Default::default()
                },
                TaskResponse::default(),
            ],
        };
        assert!(!response.is_complete());

        response.task_responses[1].results.push(json!(4));
        assert!(response.is_complete());
    }

    #[test]
    fn test_group_continuation_concatenates_in_order() {
        let response = CenterResponse {
            uuid: "u".into(),
            user: "admin".into(),
            batch_id: "batch-7".into(),
            timestamp: 0,
            task_type: TaskKind::Group,
            task_responses: vec![
                TaskResponse {
                    signatures: vec![add(1, 1), add(2, 2)],
                    ..Default::default()
                },
                TaskResponse {
                    signatures: vec![add(5, 6)],
                    ..Default::default()
                },
            ],
        };

        let continuation = response.continuation().unwrap();
        assert_eq!(continuation.batch_id, "batch-7");
        assert_eq!(continuation.task_type, TaskKind::Group);
        let args: Vec<_> = continuation
            .signatures
            .iter()
            .map(|s| s.args[0].value.clone())
            .collect();
        assert_eq!(args, vec![json!(1), json!(2), json!(5)]);
        assert!(continuation.call_back.is_none());
    }

    #[test]
    fn test_non_group_continuation_takes_first_response() {
        let response = CenterResponse {
            uuid: String::new(),
            user: String::new(),
            batch_id: "batch-8".into(),
            timestamp: 0,
            task_type: TaskKind::Chain,
            task_responses: vec![
                TaskResponse {
                    signatures: vec![add(1, 1), add(2, 2)],
                    call_back: Some(Signature::new("multiply")),
                    ..Default::default()
                },
                TaskResponse {
                    signatures: vec![add(5, 6)],
                    ..Default::default()
                },
            ],
        };

        let continuation = response.continuation().unwrap();
        assert_eq!(continuation.signatures.len(), 2);
        // A chain never synthesizes a callback, even if the service sent one.
        assert!(continuation.call_back.is_none());
    }

    #[test]
    fn test_chord_continuation_carries_callback() {
        let response = CenterResponse {
            uuid: String::new(),
            user: String::new(),
            batch_id: "batch-9".into(),
            timestamp: 0,
            task_type: TaskKind::Chord,
            task_responses: vec![TaskResponse {
                signatures: vec![add(1, 1), add(5, 6)],
                call_back: Some(Signature::new("multiply")),
                ..Default::default()
            }],
        };

        let continuation = response.continuation().unwrap();
        assert_eq!(continuation.call_back.unwrap().name, "multiply");
    }

    #[test]
    fn test_continuation_rejects_empty_partial() {
        let response = CenterResponse {
            uuid: String::new(),
            user: String::new(),
            batch_id: "batch-10".into(),
            timestamp: 0,
            task_type: TaskKind::Task,
            task_responses: vec![],
        };
        assert!(matches!(
            response.continuation(),
            Err(ClientError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_signatures() {
        let request = CenterRequest::new(TaskKind::Task, vec![]);
        assert!(matches!(
            request.validate(),
            Err(ClientError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_validate_bounds() {
        let mut request = CenterRequest::new(TaskKind::Task, vec![add(1, 1)]);
        assert!(request.validate().is_ok());

        request.timeout_duration = 99;
        assert!(request.validate().is_err());
        request.timeout_duration = 5000;
        assert!(request.validate().is_ok());

        request.sleep_duration = 501;
        assert!(request.validate().is_err());
        request.sleep_duration = 50;
        assert!(request.validate().is_ok());

        request.send_concurrency = 11;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_chord_callback_pairing() {
        let chord = CenterRequest::new(TaskKind::Chord, vec![add(1, 1), add(5, 6)]);
        assert!(chord.validate().is_err());

        let chord = chord.with_call_back(Signature::new("multiply"));
        assert!(chord.validate().is_ok());

        let group = CenterRequest::new(TaskKind::Group, vec![add(1, 1)])
            .with_call_back(Signature::new("multiply"));
        assert!(group.validate().is_err());
    }
}
