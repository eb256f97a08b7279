//! # blog-export
//!
//! Async client library for driving a blog server's PDF export workflow.
//!
//! ## Design Philosophy
//!
//! blog-export is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to typed lifecycle events;
//!   no failure is ever swallowed inside the workflow
//! - **Explicitly bounded** - Polling carries a configurable deadline,
//!   check limit, and cancellation token instead of spinning forever
//!
//! The crate also ships the two presentational helpers that historically
//! accompanied the export button: a live Markdown preview pane and a
//! hover-menu grace timer.
//!
//! ## Quick Start
//!
//! ```no_run
//! use blog_export::{Config, CsrfToken, PdfExporter, ResourceId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         base_url: "https://blog.example.com".to_string(),
//!         csrf_token: Some(CsrfToken::new("token-from-form")),
//!         ..Default::default()
//!     };
//!
//!     let exporter = PdfExporter::new(config)?;
//!
//!     // Subscribe to lifecycle events
//!     let mut events = exporter.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let handle = exporter.export(ResourceId::new("42")?).await?;
//!     let download_url = handle.wait().await?;
//!     println!("PDF ready at {download_url}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP client for the export API
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Export workflow orchestration
pub mod exporter;
/// Hover menu grace-delay timing
pub mod menu;
/// Status polling state machine
pub mod poller;
/// Markdown preview rendering
pub mod preview;
/// Trigger control state
pub mod trigger;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use client::ExportClient;
pub use config::{Config, MenuConfig, PollConfig, PreviewConfig, PreviewMode, TriggerConfig};
pub use error::{Error, Result};
pub use exporter::{ExportHandle, PdfExporter};
pub use menu::HoverMenu;
pub use poller::StatusPoller;
pub use preview::PreviewPane;
pub use trigger::TriggerControl;
pub use types::{CsrfToken, ExportEvent, ResourceId, TaskId, TaskStatus};
