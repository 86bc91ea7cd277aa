//! The generate-then-edit workflow: state, transitions, and the async controller.

mod controller;
mod state;

pub use controller::{Workflow, PLACEHOLDER_FILE_NAME};
pub use state::{Event, TaskStatus, UploadPlan, WorkflowState};
