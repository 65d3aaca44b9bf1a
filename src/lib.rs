//! Rust client for the Aurora task-center HTTP API
//!
//! Submits composite units of work (single tasks, groups, chains, chords)
//! to the task center and retrieves their results. The call looks
//! synchronous; under the hood the client logs in on demand, recovers from
//! expired sessions, and follows partial responses through the touch
//! endpoint until the batch completes.
//!
//! # Example
//!
//! ```rust,no_run
//! use aurora_client::{AuroraClient, AuroraConfig, CenterRequest, Signature, TaskKind};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AuroraClient::new(AuroraConfig {
//!     login_url: "http://localhost/auth".into(),
//!     tasks_url: "http://localhost/tasks/send".into(),
//!     touch_url: "http://localhost/tasks/touch".into(),
//!     name: "admin".into(),
//!     password: "password".into(),
//!     ..Default::default()
//! });
//!
//! // (1+1), (2+2) and (5+6) executed in parallel
//! let request = CenterRequest::new(
//!     TaskKind::Group,
//!     vec![
//!         Signature::new("add").with_arg("int64", 1).with_arg("int64", 1),
//!         Signature::new("add").with_arg("int64", 2).with_arg("int64", 2),
//!         Signature::new("add").with_arg("int64", 5).with_arg("int64", 6),
//!     ],
//! )
//! .with_concurrency(3);
//!
//! let response = client.send_sync(&request).await?;
//! for task in &response.task_responses {
//!     println!("results: {:?}", task.results);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod poll;
pub mod session;
pub mod types;

// Re-export main types
pub use client::AuroraClient;
pub use error::{ClientError, Result};
pub use poll::TouchOutcome;
pub use session::Credentials;
pub use types::{
    Arg, AuroraConfig, AuthRequest, AuthResponse, CenterRequest, CenterResponse, Headers,
    Signature, TaskKind, TaskResponse,
};
