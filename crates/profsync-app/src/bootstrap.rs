//! Process wiring: configuration, logging, run context and the sequencer.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use profsync_config::{
    ConfigOrigin, LoadedConfig, LogFileFormat, MigrationConfig, load_or_initialise,
};
use profsync_events::{Event, EventBus, EventJournal};
use profsync_exec::{AccessGate, ProcessLauncher, SystemLauncher};
use profsync_telemetry::{
    GlobalContextGuard, LogFormat, LoggingConfig, Metrics, RunContext, init_logging,
    timestamped_log_path,
};
use tracing::{error, info, warn};

use crate::cli::Cli;
use crate::error::{AppError, AppResult};
use crate::prompt::{AutoConfirmer, Confirmer, StdinConfirmer, prompt_line, prompt_required};
use crate::sequencer::{MigrationPlan, Sequencer};

const JOURNAL_GRACE: Duration = Duration::from_secs(5);

/// Remote and local identity of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInputs {
    /// Remote machine name or address.
    pub machine: String,
    /// Remote user name.
    pub user: String,
    /// Local destination directory.
    pub destination: PathBuf,
}

impl RunInputs {
    /// Take inputs from the command line, prompting for anything missing.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::MissingInput`] when the machine or user stays empty.
    pub fn from_cli_or_prompt(cli: &Cli) -> AppResult<Self> {
        let machine = match non_empty(cli.machine.as_deref()) {
            Some(machine) => machine,
            None => prompt_required("machine", "Enter remote machine name or IP", None)?,
        };
        let user = match non_empty(cli.username.as_deref()) {
            Some(user) => user,
            None => prompt_required("username", "Enter remote user name", None)?,
        };
        let destination = match &cli.destination {
            Some(destination) => destination.clone(),
            None => {
                let current = std::env::current_dir()
                    .map_err(|source| AppError::io("current_dir", None, source))?;
                let default = current.display().to_string();
                PathBuf::from(prompt_line("Enter destination path", Some(&default))?)
            }
        };
        Ok(Self {
            machine,
            user,
            destination,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Load the configuration file, apply command-line overrides and validate.
///
/// # Errors
///
/// Returns [`AppError::Config`] when the file cannot be read, written or
/// validated.
pub fn load_config(cli: &Cli) -> AppResult<LoadedConfig> {
    let mut loaded =
        load_or_initialise(&cli.config).map_err(|err| AppError::config("config.load", err))?;
    cli.overrides().apply(&mut loaded.config);
    loaded
        .config
        .validate()
        .map_err(|err| AppError::config("config.validate", err))?;
    Ok(loaded)
}

/// Entry point for the binary.
///
/// # Errors
///
/// Returns an error when configuration, logging or required inputs are unusable.
pub async fn run_app() -> AppResult<u8> {
    let cli = Cli::parse();
    let confirmer: Arc<dyn Confirmer> = if cli.yes {
        Arc::new(AutoConfirmer)
    } else {
        Arc::new(StdinConfirmer)
    };
    let LoadedConfig { config, origin } = load_config(&cli)?;
    install_logging(&config)?;
    if origin == ConfigOrigin::Initialised {
        info!(path = %cli.config.display(), "wrote default configuration");
    }
    let inputs = match RunInputs::from_cli_or_prompt(&cli) {
        Ok(inputs) => inputs,
        Err(AppError::MissingInput { field }) => {
            error!(field, "remote machine name and username are required");
            return Ok(1);
        }
        Err(err) => return Err(err),
    };
    run_with(&cli, config, inputs, Arc::new(SystemLauncher), confirmer).await
}

fn install_logging(config: &MigrationConfig) -> AppResult<()> {
    let log_path = timestamped_log_path(&config.logging.directory, &Local::now());
    let format = match config.logging.format {
        LogFileFormat::Pretty => LogFormat::Pretty,
        LogFileFormat::Json => LogFormat::Json,
    };
    init_logging(&LoggingConfig {
        level: &config.logging.level,
        format,
        log_file: Some(&log_path),
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    info!(log_file = %log_path.display(), "logging initialised");
    Ok(())
}

/// Run one migration with injected collaborators and return the exit status.
///
/// # Errors
///
/// Returns an error when the event journal or metrics registry cannot start.
pub async fn run_with(
    cli: &Cli,
    config: MigrationConfig,
    inputs: RunInputs,
    launcher: Arc<dyn ProcessLauncher>,
    confirmer: Arc<dyn Confirmer>,
) -> AppResult<u8> {
    let context = RunContext::new(&inputs.machine, &inputs.user, cli.dry_run);
    let _context = GlobalContextGuard::new(&context);
    if cli.dry_run {
        info!("dry run: commands are logged, nothing is executed");
    }

    let events = EventBus::new();
    let journal = match &cli.events_file {
        Some(path) => Some(
            EventJournal::start(&events, path)
                .await
                .map_err(|err| AppError::journal("journal.start", err))?,
        ),
        None => None,
    };
    let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let _ = events.publish(Event::RunStarted {
        run_id: context.run_id,
        host: inputs.machine.clone(),
        user: inputs.user.clone(),
        dry_run: cli.dry_run,
    });

    let gate = AccessGate::from_settings(&config.access, events.clone());
    let plan = MigrationPlan::resolve(
        &inputs.machine,
        &inputs.user,
        inputs.destination,
        cli.dry_run,
        config,
    );
    let sequencer = Sequencer::new(
        plan,
        gate,
        launcher,
        Arc::clone(&confirmer),
        events,
        metrics.clone(),
    );
    let summary = sequencer.run().await;

    if let Some(journal) = journal {
        finish_journal(journal).await;
    }
    if let Some(path) = &cli.metrics_file {
        write_metrics(&metrics, path);
    }
    if !cli.no_pause {
        let pausing = Arc::clone(&confirmer);
        if let Err(err) = tokio::task::spawn_blocking(move || pausing.pause()).await {
            warn!(error = %err, "review pause stopped unexpectedly");
        }
    }
    Ok(summary.exit_code())
}

async fn finish_journal(journal: EventJournal) {
    let path = journal.path().to_path_buf();
    match journal.finish(JOURNAL_GRACE).await {
        Ok(written) => info!(events = written, path = %path.display(), "event journal written"),
        Err(err) => warn!(error = %err, detail = ?err, path = %path.display(), "event journal incomplete"),
    }
}

fn write_metrics(metrics: &Metrics, path: &Path) {
    match metrics.write_textfile(path) {
        Ok(()) => info!(path = %path.display(), "metrics written"),
        Err(err) => warn!(error = %err, detail = ?err, path = %path.display(), "metrics could not be written"),
    }
}
