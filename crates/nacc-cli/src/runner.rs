//! Gear runs over files on disk.
//!
//! Each `run_*` function reads one input file through its visitor, writes
//! the gear's outputs and returns a [`GearRun`] with the collected file
//! errors. Whole-file transforms (APOE, center split) only write output when
//! every row passed; the per-row gears write the rows that passed.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nacc_gears::{
    APOE_OUTPUT_COLUMNS, ApoeVisitor, CenterLookupVisitor, CenterSplitVisitor,
    FieldTransformations, NaccidLookupVisitor, ProvisioningOutcome, ProvisioningVisitor,
    SubjectSplitVisitor, TransformVisitor, TransformerFactory,
};
use nacc_identifiers::{IdentifierRepository, SqliteIdentifierRepository};
use nacc_ingest::{
    CsvPipeline, CsvVisitor, CsvWriter, ErrorWriter, ListErrorWriter, LogErrorWriter,
    PipelineStats, write_json_list, write_yaml_list,
};
use nacc_model::{CenterId, ModuleName};
use nacc_scheduler::{
    FormScheduler, FormSchedulerQueue, LocalProject, RunSummary, Submission, SubmissionPipeline,
};
use tracing::{info, info_span, warn};

use crate::config::GearConfig;
use crate::logging::log_data_enabled;

/// Outcome of one gear over one input file.
#[derive(Debug)]
pub struct GearRun {
    pub gear: &'static str,
    pub input: PathBuf,
    pub stats: PipelineStats,
    pub errors: ListErrorWriter,
    pub outputs: Vec<PathBuf>,
    /// Gear specific counts shown in the summary.
    pub details: Vec<(&'static str, String)>,
    /// False when the file was rejected or any row failed.
    pub succeeded: bool,
}

impl GearRun {
    /// True when the file produced errors. Alerts do not count.
    pub fn has_errors(&self) -> bool {
        self.errors.error_count() > 0
    }
}

fn container_id(input: &Path) -> String {
    input
        .file_name()
        .map_or_else(|| input.display().to_string(), |name| name.to_string_lossy().into_owned())
}

fn visit_file(gear: &'static str, input: &Path, visitor: &mut dyn CsvVisitor) -> Result<GearRun> {
    let _span = info_span!("gear", gear, input = %input.display()).entered();
    let file = File::open(input).with_context(|| format!("open {}", input.display()))?;
    let container = container_id(input);
    let mut errors = ListErrorWriter::new(container.clone());

    let mut pipeline = CsvPipeline::new(&mut errors, visitor);
    let succeeded = pipeline
        .run(BufReader::new(file))
        .with_context(|| format!("process {}", input.display()))?;
    let stats = pipeline.stats();

    let mut log = LogErrorWriter::new(container).with_values(log_data_enabled());
    for error in errors.errors() {
        log.write(error.clone());
    }
    info!(
        rows = stats.rows,
        failed_rows = stats.failed_rows,
        errors = errors.error_count(),
        alerts = errors.alert_count(),
        "file processed"
    );

    Ok(GearRun {
        gear,
        input: input.to_path_buf(),
        stats,
        errors,
        outputs: Vec::new(),
        details: Vec::new(),
        succeeded,
    })
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn finish_output(writer: BufWriter<File>, path: &Path) -> Result<()> {
    writer
        .into_inner()
        .map_err(std::io::IntoInnerError::into_error)
        .and_then(|file| file.sync_all())
        .with_context(|| format!("write {}", path.display()))
}

/// Opens the SQLite registry named in the configuration.
pub fn open_repository(config: &GearConfig) -> Result<SqliteIdentifierRepository> {
    let path = config.database()?;
    SqliteIdentifierRepository::open(path)
        .with_context(|| format!("open identifier registry {}", path.display()))
}

pub fn run_apoe(input: &Path, output: &Path) -> Result<GearRun> {
    let mut visitor = ApoeVisitor::new();
    let mut run = visit_file("apoe", input, &mut visitor)?;
    if !run.succeeded {
        warn!(output = %output.display(), "not writing output for a file with errors");
        return Ok(run);
    }
    let mut writer = CsvWriter::new(create_output(output)?, APOE_OUTPUT_COLUMNS);
    for row in visitor.rows() {
        writer.write_row(row)?;
    }
    finish_output(writer.finish()?, output)?;
    run.outputs.push(output.to_path_buf());
    Ok(run)
}

pub fn run_split_centers(input: &Path, output_dir: &Path, key: Option<&str>) -> Result<GearRun> {
    let mut visitor = key.map_or_else(CenterSplitVisitor::default, CenterSplitVisitor::new);
    let mut run = visit_file("split-centers", input, &mut visitor)?;
    if !run.succeeded {
        warn!(output = %output_dir.display(), "not splitting a file with errors");
        return Ok(run);
    }
    let file_name = container_id(input);
    run.outputs = visitor.write_center_files(output_dir, &file_name)?;
    run.details.push(("centers", visitor.groups().len().to_string()));
    Ok(run)
}

pub fn run_split_subjects(input: &Path, output_dir: &Path, required: &[String]) -> Result<GearRun> {
    let mut visitor = if required.is_empty() {
        SubjectSplitVisitor::default()
    } else {
        SubjectSplitVisitor::new(required.iter().cloned())
    };
    let mut run = visit_file("split-subjects", input, &mut visitor)?;
    run.outputs = visitor.write_subject_files(output_dir)?;
    run.details.push(("subjects", visitor.subjects().len().to_string()));
    Ok(run)
}

pub fn run_lookup_naccid(
    input: &Path,
    output: &Path,
    repository: &dyn IdentifierRepository,
    adcid: CenterId,
    module: ModuleName,
    date_field: &str,
) -> Result<GearRun> {
    let writer = create_output(output)?;
    let mut visitor =
        NaccidLookupVisitor::from_repository(repository, adcid, module, date_field, writer)?;
    let mut run = visit_file("lookup-naccid", input, &mut visitor)?;
    run.details.push(("rows written", visitor.rows_written().to_string()));
    finish_output(visitor.finish()?, output)?;
    run.outputs.push(output.to_path_buf());
    Ok(run)
}

pub fn run_lookup_center(
    input: &Path,
    output: &Path,
    repository: &dyn IdentifierRepository,
) -> Result<GearRun> {
    let mut visitor = CenterLookupVisitor::new(repository, create_output(output)?);
    let mut run = visit_file("lookup-center", input, &mut visitor)?;
    run.details.push(("rows written", visitor.rows_written().to_string()));
    finish_output(visitor.finish()?, output)?;
    run.outputs.push(output.to_path_buf());
    Ok(run)
}

/// Provisions identifiers and writes the transfer records as YAML.
///
/// Requests queued by passing rows are committed even when other rows
/// failed.
pub fn run_provision(
    input: &Path,
    transfers_output: Option<&Path>,
    repository: &dyn IdentifierRepository,
    form_name: ModuleName,
) -> Result<(GearRun, ProvisioningOutcome)> {
    let mut visitor = ProvisioningVisitor::new(form_name, repository);
    let mut run = visit_file("provision", input, &mut visitor)?;
    let outcome = visitor.finish().context("commit identifier batch")?;

    run.details.push(("identifiers created", outcome.identifiers.len().to_string()));
    run.details.push(("transfers", outcome.transfers.len().to_string()));
    if let Some(path) = transfers_output {
        let mut writer = create_output(path)?;
        write_yaml_list(&mut writer, &outcome.transfers)?;
        finish_output(writer, path)?;
        run.outputs.push(path.to_path_buf());
    }
    Ok((run, outcome))
}

pub fn run_transform(
    input: &Path,
    output_dir: &Path,
    transformations: Option<&Path>,
) -> Result<GearRun> {
    let transformations = match transformations {
        Some(path) => FieldTransformations::load(path)?,
        None => FieldTransformations::default(),
    };
    let mut visitor = TransformVisitor::new(TransformerFactory::new(transformations));
    let mut run = visit_file("transform", input, &mut visitor)?;
    if let Some(module) = visitor.module() {
        run.details.push(("module", module.to_string()));
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("create {}", output_dir.display()))?;
    for (subject, visits) in visitor.records() {
        let path = output_dir.join(format!("{subject}.json"));
        let records: Vec<_> = visits.values().collect();
        let mut writer = create_output(&path)?;
        write_json_list(&mut writer, &records)?;
        finish_output(writer, &path)?;
        run.outputs.push(path);
    }
    Ok(run)
}

/// Submission step that only logs; the local runner has no downstream
/// pipeline to trigger.
struct LoggedSubmissions;

impl SubmissionPipeline for LoggedSubmissions {
    fn submit(&mut self, submission: &Submission) -> nacc_scheduler::Result<()> {
        info!(
            module = %submission.module,
            file = %submission.file.name,
            schema = %submission.schema.name,
            "submitted file"
        );
        Ok(())
    }
}

pub fn run_schedule(
    project_dir: &Path,
    module_order: Vec<ModuleName>,
    queue_tags: &[String],
) -> Result<RunSummary> {
    let mut project = LocalProject::open(project_dir)
        .with_context(|| format!("open project {}", project_dir.display()))?;
    let queue = FormSchedulerQueue::new(module_order, queue_tags.iter().cloned())?;
    let mut pipeline = LoggedSubmissions;
    let summary = FormScheduler::new(queue, &mut project, &mut pipeline).run()?;
    Ok(summary)
}
