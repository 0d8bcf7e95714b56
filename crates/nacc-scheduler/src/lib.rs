//! Form scheduler.
//!
//! Files waiting for the submission pipeline are tagged in their project.
//! The scheduler sorts them into one queue per form module and submits one
//! file at a time, rotating over the modules in a fixed order so a large
//! backlog in one module cannot starve the others.

mod error;
mod project;
mod queue;
mod scheduler;

pub use error::{Result, SchedulerError};
pub use project::{LocalProject, Project, ProjectFile, TAG_MANIFEST};
pub use queue::{FormSchedulerQueue, module_of};
pub use scheduler::{
    FormScheduler, RecordingPipeline, RunSummary, Submission, SubmissionPipeline,
    schema_file_name,
};
