// crates/firmware-settings-cli/src/main.rs
// ============================================================================
// Module: Firmware Settings CLI Entry Point
// Description: Command dispatcher for host records, reconciliation, and schemas.
// Purpose: Drive the reconciler against a configured store from the shell.
// Dependencies: clap, firmware-settings-config, firmware-settings-core,
//               firmware-settings-store-sqlite, serde_json, thiserror, tracing.
// ============================================================================

//! ## Overview
//! `fwsettings` registers hosts, edits their desired firmware settings, runs
//! one reconciliation pass from a JSON hardware reading, and inspects stored
//! status and schemas. Results are JSON on stdout; diagnostics and logs go to
//! stderr so output stays machine-readable. All file inputs are untrusted and
//! read with hard size limits.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod backend;
mod reader;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use firmware_settings_config::CONFIG_ENV_VAR;
use firmware_settings_config::DEFAULT_CONFIG_NAME;
use firmware_settings_config::FirmwareSettingsConfig;
use firmware_settings_config::StoreType;
use firmware_settings_core::DesiredSettingsMap;
use firmware_settings_core::HostFirmwareSettings;
use firmware_settings_core::ObjectKey;
use firmware_settings_core::Reconciler;
use firmware_settings_core::ResourceVersion;
use firmware_settings_core::SchemaMap;
use firmware_settings_core::SchemaReference;
use firmware_settings_core::SchemaStore;
use firmware_settings_core::SettingsMap;
use firmware_settings_core::SettingsStore;
use firmware_settings_core::StoreError;
use firmware_settings_core::SystemClock;
use firmware_settings_core::render_validation_errors;
use firmware_settings_core::schema_name;
use firmware_settings_core::validate_settings;
use firmware_settings_store_sqlite::MAX_PAYLOAD_BYTES;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::backend::StoreBackend;
use crate::reader::FileFirmwareReader;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of any JSON input file.
const MAX_INPUT_BYTES: usize = MAX_PAYLOAD_BYTES;
/// Environment variable holding the tracing filter.
const LOG_ENV_VAR: &str = "FWSETTINGS_LOG";
/// Tracing filter used when `FWSETTINGS_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "warn";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "fwsettings", version, disable_help_subcommand = true)]
struct Cli {
    /// Config file path (overrides `FWSETTINGS_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Host record management.
    Host {
        /// Selected host subcommand.
        #[command(subcommand)]
        command: HostCommand,
    },
    /// Run one reconciliation pass from a hardware reading file.
    Reconcile(ReconcileCommand),
    /// Print a host's stored record and status.
    Status(HostArgs),
    /// Firmware schema utilities.
    Schema {
        /// Selected schema subcommand.
        #[command(subcommand)]
        command: SchemaCommand,
    },
    /// Validate desired settings offline without touching the store.
    Validate(ValidateCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Host subcommands.
#[derive(Subcommand, Debug)]
enum HostCommand {
    /// Create the settings record for a new host.
    Register(RegisterCommand),
    /// Replace a host's desired settings.
    SetDesired(SetDesiredCommand),
}

/// Schema subcommands.
#[derive(Subcommand, Debug)]
enum SchemaCommand {
    /// Print the content-addressed name for a schema file.
    Name {
        /// JSON schema map file.
        #[arg(long, value_name = "FILE")]
        schema: PathBuf,
    },
    /// Print a stored firmware schema.
    Get(HostArgs),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate the configuration file.
    Validate,
}

/// Identity of a stored object.
#[derive(Args, Debug)]
struct HostArgs {
    /// Object namespace.
    #[arg(long)]
    namespace: String,
    /// Object name.
    #[arg(long)]
    name: String,
}

impl HostArgs {
    /// Returns the object key named by the arguments.
    fn key(&self) -> ObjectKey {
        ObjectKey::new(self.name.clone(), self.namespace.clone())
    }
}

/// Arguments for `host register`.
#[derive(Args, Debug)]
struct RegisterCommand {
    /// Host identity.
    #[command(flatten)]
    host: HostArgs,
    /// Optional JSON file with initial desired settings.
    #[arg(long, value_name = "FILE")]
    desired: Option<PathBuf>,
}

/// Arguments for `host set-desired`.
#[derive(Args, Debug)]
struct SetDesiredCommand {
    /// Host identity.
    #[command(flatten)]
    host: HostArgs,
    /// JSON file with desired settings.
    #[arg(long, value_name = "FILE")]
    desired: PathBuf,
}

/// Arguments for `reconcile`.
#[derive(Args, Debug)]
struct ReconcileCommand {
    /// Host identity.
    #[command(flatten)]
    host: HostArgs,
    /// JSON file with the hardware reading (`settings` and optional `schema`).
    #[arg(long, value_name = "FILE")]
    reading: PathBuf,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
struct ValidateCommand {
    /// JSON file with desired settings.
    #[arg(long, value_name = "FILE")]
    desired: PathBuf,
    /// JSON file with current settings.
    #[arg(long, value_name = "FILE")]
    current: PathBuf,
    /// Optional JSON schema map file.
    #[arg(long, value_name = "FILE")]
    schema: Option<PathBuf>,
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Output of commands that write a host record.
#[derive(Debug, Serialize)]
struct HostWriteReport {
    /// Host identity.
    host: ObjectKey,
    /// Version token after the write.
    version: ResourceVersion,
}

/// Output of `reconcile`.
#[derive(Debug, Serialize)]
struct ReconcileReport {
    /// Host identity.
    host: ObjectKey,
    /// Committed version token.
    version: ResourceVersion,
    /// Whether the reading differed from the previous status.
    changed: bool,
    /// Whether desired settings passed validation.
    valid: bool,
    /// Attempts used to commit.
    attempts: u32,
    /// Schema referenced by the committed status.
    schema_ref: Option<SchemaReference>,
    /// Validation messages.
    errors: Vec<String>,
}

/// Output of `validate`.
#[derive(Debug, Serialize)]
struct ValidateReport {
    /// Whether desired settings passed validation.
    valid: bool,
    /// Individual validation messages.
    errors: Vec<String>,
    /// Messages joined the way the `Valid` condition renders them.
    message: String,
}

/// Output of `schema name`.
#[derive(Debug, Serialize)]
struct SchemaNameReport {
    /// Content-addressed schema name.
    name: String,
}

/// Output of `config validate`.
#[derive(Debug, Serialize)]
struct ConfigReport {
    /// Validation result.
    status: &'static str,
    /// Selected store backend.
    store: &'static str,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying an operator-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Errors raised by bounded file reads.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// Underlying I/O failure.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// File size exceeds the configured limit.
    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Installs the stderr tracing subscriber.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Host {
            command,
        } => {
            let config = load_config(config_path)?;
            match command {
                HostCommand::Register(command) => command_host_register(&config, &command),
                HostCommand::SetDesired(command) => command_host_set_desired(&config, &command),
            }
        }
        Commands::Reconcile(command) => command_reconcile(&load_config(config_path)?, &command),
        Commands::Status(host) => command_status(&load_config(config_path)?, &host),
        Commands::Schema {
            command,
        } => match command {
            SchemaCommand::Name {
                schema,
            } => command_schema_name(&schema),
            SchemaCommand::Get(key) => command_schema_get(&load_config(config_path)?, &key),
        },
        Commands::Validate(command) => command_validate(&load_config(config_path)?, &command),
        Commands::Config {
            command: ConfigCommand::Validate,
        } => command_config_validate(config_path),
    }
}

// ============================================================================
// SECTION: Host Commands
// ============================================================================

/// Executes `host register`.
fn command_host_register(
    config: &FirmwareSettingsConfig,
    command: &RegisterCommand,
) -> CliResult<ExitCode> {
    let desired: DesiredSettingsMap = match &command.desired {
        Some(path) => read_json(path, "desired settings")?,
        None => DesiredSettingsMap::new(),
    };
    let key = command.host.key();
    let record = HostFirmwareSettings::new(key.clone()).with_desired(desired);
    let store = open_store(config)?;
    let version = store.create_settings(&record).map_err(|err| match err {
        StoreError::AlreadyExists(_) => {
            CliError::new(format!("host {key} is already registered"))
        }
        other => store_error(&other),
    })?;
    write_json(&HostWriteReport {
        host: key,
        version,
    })?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `host set-desired`.
fn command_host_set_desired(
    config: &FirmwareSettingsConfig,
    command: &SetDesiredCommand,
) -> CliResult<ExitCode> {
    let desired: DesiredSettingsMap = read_json(&command.desired, "desired settings")?;
    let key = command.host.key();
    let store = open_store(config)?;
    let mut loaded = store
        .get_settings(&key)
        .map_err(|err| store_error(&err))?
        .ok_or_else(|| not_registered(&key))?;
    loaded.value.spec.settings = desired;
    let version =
        store.update_settings(&loaded.value, loaded.version).map_err(|err| match err {
            StoreError::Conflict(_) => CliError::new(format!(
                "host {key} was modified concurrently; re-run the command"
            )),
            StoreError::NotFound(_) => not_registered(&key),
            other => store_error(&other),
        })?;
    debug!(host = %key, %version, "desired settings replaced");
    write_json(&HostWriteReport {
        host: key,
        version,
    })?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `status`.
fn command_status(config: &FirmwareSettingsConfig, host: &HostArgs) -> CliResult<ExitCode> {
    let key = host.key();
    let store = open_store(config)?;
    let record = store
        .get_settings(&key)
        .map_err(|err| store_error(&err))?
        .ok_or_else(|| not_registered(&key))?;
    write_json(&record)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Reconcile Command
// ============================================================================

/// Executes `reconcile`.
fn command_reconcile(
    config: &FirmwareSettingsConfig,
    command: &ReconcileCommand,
) -> CliResult<ExitCode> {
    let key = command.host.key();
    let store = open_store(config)?;
    let reader = FileFirmwareReader::new(command.reading.clone(), MAX_INPUT_BYTES);
    let reconciler = Reconciler::new(store, SystemClock, config.reconciler_config());
    let outcome = reconciler
        .reconcile_from_reader(&key, &reader)
        .map_err(|err| CliError::new(format!("reconcile failed: {err}")))?;
    let valid = outcome.is_valid();
    write_json(&ReconcileReport {
        host: key,
        version: outcome.settings.version,
        changed: outcome.changed,
        valid,
        attempts: outcome.attempts,
        schema_ref: outcome.schema_ref,
        errors: outcome.errors.iter().map(ToString::to_string).collect(),
    })?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Schema Commands
// ============================================================================

/// Executes `schema name`.
fn command_schema_name(path: &Path) -> CliResult<ExitCode> {
    let schema: SchemaMap = read_json(path, "schema")?;
    let name =
        schema_name(&schema).map_err(|err| CliError::new(format!("schema hash failed: {err}")))?;
    write_json(&SchemaNameReport {
        name,
    })?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `schema get`.
fn command_schema_get(config: &FirmwareSettingsConfig, key: &HostArgs) -> CliResult<ExitCode> {
    let key = key.key();
    let store = open_store(config)?;
    let schema = store
        .get_schema(&key)
        .map_err(|err| store_error(&err))?
        .ok_or_else(|| CliError::new(format!("firmware schema {key} not found")))?;
    write_json(&schema)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Validate Command
// ============================================================================

/// Executes `validate`; exits with failure when any setting is invalid.
fn command_validate(
    config: &FirmwareSettingsConfig,
    command: &ValidateCommand,
) -> CliResult<ExitCode> {
    let desired: DesiredSettingsMap = read_json(&command.desired, "desired settings")?;
    let current: SettingsMap = read_json(&command.current, "current settings")?;
    let schema: SchemaMap = match &command.schema {
        Some(path) => read_json(path, "schema")?,
        None => SchemaMap::new(),
    };
    let policy = config.reconciler_config().validation;
    let errors = validate_settings(&desired, &current, &schema, &policy);
    let report = ValidateReport {
        valid: errors.is_empty(),
        errors: errors.iter().map(ToString::to_string).collect(),
        message: render_validation_errors(&errors),
    };
    write_json(&report)?;
    Ok(if report.valid { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

// ============================================================================
// SECTION: Config Command
// ============================================================================

/// Executes `config validate`.
fn command_config_validate(path: Option<&Path>) -> CliResult<ExitCode> {
    let config = FirmwareSettingsConfig::load(path)
        .map_err(|err| CliError::new(format!("config validation failed: {err}")))?;
    let store = match config.store.store_type {
        StoreType::Memory => "memory",
        StoreType::Sqlite => "sqlite",
    };
    write_json(&ConfigReport {
        status: "ok",
        store,
    })?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config and Store
// ============================================================================

/// Loads configuration, falling back to defaults when no file is configured.
///
/// Defaults apply only when no path was given, `FWSETTINGS_CONFIG` is unset,
/// and `firmware-settings.toml` does not exist.
fn load_config(path: Option<&Path>) -> CliResult<FirmwareSettingsConfig> {
    let unconfigured = path.is_none()
        && std::env::var_os(CONFIG_ENV_VAR).is_none()
        && !Path::new(DEFAULT_CONFIG_NAME).exists();
    if unconfigured {
        debug!("no config file found; using defaults");
        return Ok(FirmwareSettingsConfig::default());
    }
    FirmwareSettingsConfig::load(path)
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Opens the configured object store.
fn open_store(config: &FirmwareSettingsConfig) -> CliResult<StoreBackend> {
    StoreBackend::open(&config.store)
        .map_err(|err| CliError::new(format!("failed to open store: {err}")))
}

/// Formats a store failure.
fn store_error(error: &StoreError) -> CliError {
    CliError::new(format!("store operation failed: {error}"))
}

/// Formats a missing-host failure.
fn not_registered(key: &ObjectKey) -> CliError {
    CliError::new(format!("host {key} is not registered"))
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes)?;
    if bytes.len() > max_bytes {
        let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge {
            size: actual,
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Reads and parses a bounded JSON input file.
fn read_json<T: DeserializeOwned>(path: &Path, kind: &str) -> CliResult<T> {
    let bytes = read_bytes_with_limit(path, MAX_INPUT_BYTES).map_err(|err| {
        CliError::new(format!("failed to read {kind} file {}: {err}", path.display()))
    })?;
    serde_json::from_slice(&bytes).map_err(|err| {
        CliError::new(format!("invalid {kind} file {}: {err}", path.display()))
    })
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes pretty JSON to stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    write_stdout_line(&text).map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
