//! Document upload and analysis for the Ontime assistant.
//!
//! Uploads a selected file, starts server-side analysis, and polls the
//! job until it completes, fails, or runs out of attempts. Each file gets
//! its own independent loop.

pub mod error;
pub mod handler;
pub mod timer;
pub mod tracker;
pub mod workflow;

pub use error::DocumentError;
pub use handler::FilesSelectedHandler;
pub use timer::{InstantTimer, PollPolicy, PollTimer, TokioTimer};
pub use tracker::UploadTracker;
pub use workflow::{DocumentWorkflow, SelectedFile, UploadOutcome, UploadStage};
