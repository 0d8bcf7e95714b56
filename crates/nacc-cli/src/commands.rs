use anyhow::{Context, Result, bail};
use nacc_cli::config::GearConfig;
use nacc_cli::runner::{
    GearRun, open_repository, run_apoe, run_lookup_center, run_lookup_naccid, run_provision,
    run_schedule, run_split_centers, run_split_subjects, run_transform,
};
use nacc_identifiers::{IdentifierQuery, IdentifierRepository};
use nacc_model::{CenterId, Guid, Identifier, Naccid, Ptid};
use nacc_scheduler::RunSummary;

use crate::cli::{Command, DatabaseArgs, IdentifiersCommand, InputArgs};

/// What a command produced, for the summary printer.
pub enum Outcome {
    Gear(GearRun),
    Schedule(RunSummary),
    Identifiers(Vec<Identifier>),
}

fn with_database(mut config: GearConfig, database: DatabaseArgs) -> GearConfig {
    if let Some(path) = database.db {
        config.identifiers.database = Some(path);
    }
    config
}

/// Writes the error report when `--errors` was given.
fn save_errors(file: &InputArgs, run: GearRun) -> Result<Outcome> {
    if let Some(path) = &file.errors {
        run.errors
            .save(path)
            .with_context(|| format!("write error report {}", path.display()))?;
    }
    Ok(Outcome::Gear(run))
}

pub fn run_command(command: Command, config: GearConfig) -> Result<Outcome> {
    match command {
        Command::Apoe(args) => {
            let run = run_apoe(&args.file.input, &args.output)?;
            save_errors(&args.file, run)
        }
        Command::SplitCenters(args) => {
            let run = run_split_centers(&args.file.input, &args.output_dir, args.key.as_deref())?;
            save_errors(&args.file, run)
        }
        Command::SplitSubjects(args) => {
            let run = run_split_subjects(&args.file.input, &args.output_dir, &args.require)?;
            save_errors(&args.file, run)
        }
        Command::LookupNaccid(args) => {
            let mut config = with_database(config, args.database);
            if let Some(adcid) = args.adcid {
                config.lookup.adcid = Some(adcid);
            }
            if let Some(module) = args.module {
                config.lookup.module = Some(module);
            }
            if let Some(date_field) = args.date_field {
                config.lookup.date_field = date_field;
            }
            let adcid = config.lookup_center()?;
            let module = config.lookup_module()?;
            let repository = open_repository(&config)?;
            let run = run_lookup_naccid(
                &args.file.input,
                &args.output,
                &repository,
                adcid,
                module,
                &config.lookup.date_field,
            )?;
            save_errors(&args.file, run)
        }
        Command::LookupCenter(args) => {
            let config = with_database(config, args.database);
            let repository = open_repository(&config)?;
            let run = run_lookup_center(&args.file.input, &args.output, &repository)?;
            save_errors(&args.file, run)
        }
        Command::Provision(args) => {
            let mut config = with_database(config, args.database);
            if let Some(form_name) = args.form_name {
                config.provisioning.form_name = form_name;
            }
            let form_name = config.form_name()?;
            let repository = open_repository(&config)?;
            let (run, _) = run_provision(
                &args.file.input,
                args.transfers.as_deref(),
                &repository,
                form_name,
            )?;
            save_errors(&args.file, run)
        }
        Command::Transform(args) => {
            let transformations = args
                .transformations
                .or_else(|| config.transform.transformations.clone());
            let run = run_transform(
                &args.file.input,
                &args.output_dir,
                transformations.as_deref(),
            )?;
            save_errors(&args.file, run)
        }
        Command::Schedule(args) => {
            let mut config = config;
            if !args.modules.is_empty() {
                config.scheduler.module_order = args.modules;
            }
            if !args.tags.is_empty() {
                config.scheduler.queue_tags = args.tags;
            }
            let module_order = config.module_order()?;
            let summary = run_schedule(&args.project, module_order, &config.scheduler.queue_tags)?;
            Ok(Outcome::Schedule(summary))
        }
        Command::Identifiers { command } => run_identifiers(command, config),
    }
}

fn run_identifiers(command: IdentifiersCommand, config: GearConfig) -> Result<Outcome> {
    match command {
        IdentifiersCommand::List { database, adcid } => {
            let config = with_database(config, database);
            let repository = open_repository(&config)?;
            let records = repository.list(adcid.map(CenterId::new))?;
            Ok(Outcome::Identifiers(records))
        }
        IdentifiersCommand::Get {
            database,
            naccid,
            guid,
            adcid,
            ptid,
        } => {
            let query = match (naccid, guid, adcid, ptid) {
                (Some(naccid), _, _, _) => IdentifierQuery::ByNaccid(naccid.parse::<Naccid>()?),
                (None, Some(guid), _, _) => IdentifierQuery::ByGuid(Guid::new(guid)?),
                (None, None, Some(adcid), Some(ptid)) => {
                    IdentifierQuery::center(CenterId::new(adcid), Ptid::new(ptid)?)
                }
                _ => bail!("give --naccid, --guid or --adcid with --ptid"),
            };
            let config = with_database(config, database);
            let repository = open_repository(&config)?;
            let record = repository.get(&query)?;
            Ok(Outcome::Identifiers(vec![record]))
        }
    }
}
