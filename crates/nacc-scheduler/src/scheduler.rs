//! Scheduler loop that feeds queued files to the submission pipeline.

use nacc_model::ModuleName;
use tracing::{debug, info, info_span};

use crate::error::{Result, SchedulerError};
use crate::project::{Project, ProjectFile};
use crate::queue::FormSchedulerQueue;

/// Schema file each module must provide in the project.
pub fn schema_file_name(module: &ModuleName) -> String {
    format!("{module}-schema.json")
}

/// One file handed to the submission pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub module: ModuleName,
    pub file: ProjectFile,
    pub schema: ProjectFile,
}

/// Runs the submission pipeline for one file, returning when it finishes.
pub trait SubmissionPipeline {
    fn submit(&mut self, submission: &Submission) -> Result<()>;
}

/// Pipeline that only records what it was given.
#[derive(Debug, Clone, Default)]
pub struct RecordingPipeline {
    submissions: Vec<Submission>,
}

impl RecordingPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }
}

impl SubmissionPipeline for RecordingPipeline {
    fn submit(&mut self, submission: &Submission) -> Result<()> {
        self.submissions.push(submission.clone());
        Ok(())
    }
}

/// Outcome of a scheduler run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Times the project was scanned for queued files.
    pub scans: usize,
    /// Files submitted, in submission order.
    pub submitted: Vec<(ModuleName, String)>,
}

/// Drains the project's queued files one at a time in round-robin order.
pub struct FormScheduler<'a> {
    queue: FormSchedulerQueue,
    project: &'a mut dyn Project,
    pipeline: &'a mut dyn SubmissionPipeline,
}

impl<'a> FormScheduler<'a> {
    pub fn new(
        queue: FormSchedulerQueue,
        project: &'a mut dyn Project,
        pipeline: &'a mut dyn SubmissionPipeline,
    ) -> Self {
        Self {
            queue,
            project,
            pipeline,
        }
    }

    /// Scans for queued files and submits them until a scan finds none.
    ///
    /// Each submitted file has the queue tags removed before submission so
    /// it is not queued again.
    pub fn run(&mut self) -> Result<RunSummary> {
        let _span = info_span!("form_scheduler").entered();
        let mut summary = RunSummary::default();
        loop {
            let added = self.queue.add_files(&*self.project)?;
            summary.scans += 1;
            info!(added, "pulled queued files");
            if added == 0 {
                break;
            }

            while !self.queue.empty() {
                let (module, queue) = self.queue.next_queue();
                if queue.is_empty() {
                    continue;
                }
                let module = module.clone();
                let file = queue.remove(0);

                self.project
                    .remove_tags(&file.name, self.queue.queue_tags())?;
                let schema = self
                    .project
                    .file(&schema_file_name(&module))?
                    .ok_or_else(|| SchedulerError::MissingSchema(module.clone()))?;

                info!(file = %file.name, %module, "submitting file");
                let submission = Submission {
                    module: module.clone(),
                    file,
                    schema,
                };
                self.pipeline.submit(&submission)?;
                debug!(file = %submission.file.name, "submission finished");
                summary.submitted.push((module, submission.file.name));
            }
        }
        info!(
            submitted = summary.submitted.len(),
            "no more queued files to process"
        );
        Ok(summary)
    }
}
