// crates/proofpack-cli/src/main.rs
// ============================================================================
// Module: Proof-Pack CLI Entry Point
// Description: Command dispatcher for proof-pack verification and baselines.
// Purpose: Expose verify and baseline workflows with stable exit codes.
// Dependencies: clap, proofpack-config, proofpack-core, proofpack-store-fs
// ============================================================================

//! ## Overview
//! `proofpack verify <RUN_DIR>` re-verifies a written proof-pack and prints
//! the structured report as JSON. `proofpack baseline` registers, lists,
//! checks, and certifies baselines in a registry on disk.
//!
//! Exit codes: 0 success, 1 verification or integrity failure, 2 usage or
//! configuration error, 3 not found, 4 version conflict.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use proofpack_config::ConfigError;
use proofpack_config::ProofPackConfig;
use proofpack_core::ArtifactError;
use proofpack_core::AuditSink;
use proofpack_core::BaselineError;
use proofpack_core::BaselineService;
use proofpack_core::BaselineVersion;
use proofpack_core::IntentId;
use proofpack_core::IntentRecord;
use proofpack_core::ProofPackError;
use proofpack_core::ProofPackVerifier;
use proofpack_core::RegistryError;
use proofpack_core::Timestamp;
use proofpack_core::runtime::BaselineRegistration;
use proofpack_store_fs::FileArtifactStore;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exit code for failed verification or integrity checks.
const EXIT_FAILURE: u8 = 1;
/// Exit code for usage and configuration errors.
const EXIT_USAGE: u8 = 2;
/// Exit code for missing runs, files, or baseline versions.
const EXIT_NOT_FOUND: u8 = 3;
/// Exit code for re-registering an existing baseline version.
const EXIT_CONFLICT: u8 = 4;
/// Maximum size of an intent file read from disk.
const MAX_INTENT_FILE_BYTES: u64 = 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "proofpack", disable_help_subcommand = true)]
struct Cli {
    /// Optional config file path (defaults to proofpack.toml or env override).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify a proof-pack against its artifacts.
    Verify(VerifyCommand),
    /// Baseline registry utilities.
    Baseline(BaselineArgs),
}

/// Arguments for `verify`.
#[derive(Args, Debug)]
struct VerifyCommand {
    /// Run directory holding `manifest.json`.
    #[arg(value_name = "RUN_DIR")]
    run_dir: PathBuf,
    /// Also check canonical form, detached artifact hashes, and the tree file.
    #[arg(long, action = ArgAction::SetTrue)]
    strict: bool,
}

/// Arguments shared by `baseline` subcommands.
#[derive(Args, Debug)]
struct BaselineArgs {
    /// Directory containing the baseline root.
    #[arg(long, value_name = "DIR", default_value = ".", global = true)]
    store: PathBuf,
    /// Selected baseline subcommand.
    #[command(subcommand)]
    command: BaselineCommand,
}

/// Baseline subcommands.
#[derive(Subcommand, Debug)]
enum BaselineCommand {
    /// Register a new baseline version.
    Register(RegisterCommand),
    /// List registered baselines.
    List,
    /// Re-check the stored hashes of a baseline.
    Check(VersionCommand),
    /// Re-check a baseline and report whether it is certified.
    Certify(VersionCommand),
}

/// Arguments for `baseline register`.
#[derive(Args, Debug)]
struct RegisterCommand {
    /// Version to register.
    #[arg(value_name = "VERSION")]
    version: String,
    /// Intent document as `ID=PATH`; repeatable.
    #[arg(long = "intent", value_name = "ID=PATH", value_parser = parse_intent_arg)]
    intents: Vec<IntentArg>,
    /// Register the baseline as certified.
    #[arg(long, action = ArgAction::SetTrue)]
    certified: bool,
    /// Registration time (RFC 3339); defaults to now.
    #[arg(long, value_name = "RFC3339")]
    created_at: Option<String>,
}

/// Arguments naming one baseline version.
#[derive(Args, Debug)]
struct VersionCommand {
    /// Baseline version.
    #[arg(value_name = "VERSION")]
    version: String,
}

/// Parsed `--intent ID=PATH` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IntentArg {
    /// Intent id.
    id: IntentId,
    /// Intent document path.
    path: PathBuf,
}

/// Parses an `ID=PATH` intent argument.
fn parse_intent_arg(value: &str) -> Result<IntentArg, String> {
    let (id, path) =
        value.split_once('=').ok_or_else(|| format!("expected ID=PATH, got {value}"))?;
    if id.trim().is_empty() || path.is_empty() {
        return Err(format!("expected ID=PATH, got {value}"));
    }
    Ok(IntentArg {
        id: IntentId::new(id),
        path: PathBuf::from(path),
    })
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI errors, each mapped to an exit code.
#[derive(Debug, Error)]
enum CliError {
    /// Invalid arguments or inputs.
    #[error("usage error: {0}")]
    Usage(String),
    /// Configuration failed to load.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A run, file, or version does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Baseline version already registered.
    #[error("version conflict: {0}")]
    Conflict(String),
    /// Operation failed after starting.
    #[error("{0}")]
    Failed(String),
    /// Writing output failed.
    #[error("output error: {0}")]
    Output(String),
}

impl CliError {
    /// Returns the process exit code for this error.
    const fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) | Self::Config(_) => EXIT_USAGE,
            Self::NotFound(_) => EXIT_NOT_FOUND,
            Self::Conflict(_) => EXIT_CONFLICT,
            Self::Failed(_) | Self::Output(_) => EXIT_FAILURE,
        }
    }
}

impl From<ArtifactError> for CliError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::NotFound(_) => Self::NotFound(err.to_string()),
            ArtifactError::InvalidPath(_) => Self::Usage(err.to_string()),
            ArtifactError::Io(_)
            | ArtifactError::TooLarge {
                ..
            } => Self::Failed(err.to_string()),
        }
    }
}

impl From<ProofPackError> for CliError {
    fn from(err: ProofPackError) -> Self {
        match err {
            ProofPackError::Artifact(inner) => inner.into(),
            ProofPackError::MissingManifest(_) | ProofPackError::MissingManifestHash(_) => {
                Self::NotFound(err.to_string())
            }
            _ => Self::Failed(err.to_string()),
        }
    }
}

impl From<BaselineError> for CliError {
    fn from(err: BaselineError) -> Self {
        match err {
            BaselineError::Registry(RegistryError::VersionExists {
                ..
            })
            | BaselineError::DirectoryExists(_) => Self::Conflict(err.to_string()),
            BaselineError::NotFound(_) => Self::NotFound(err.to_string()),
            BaselineError::DuplicateIntent(_)
            | BaselineError::InvalidIntent {
                ..
            } => Self::Usage(err.to_string()),
            BaselineError::Artifact(inner) => inner.into(),
            BaselineError::MalformedRegistry(_)
            | BaselineError::Canonical(_)
            | BaselineError::Hash(_) => Self::Failed(err.to_string()),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() { ExitCode::from(EXIT_USAGE) } else { ExitCode::SUCCESS };
        }
    };
    let mut stdout = std::io::stdout();
    match run(cli, &mut stdout) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_FAILURE),
        Err(err) => {
            let _ = writeln!(std::io::stderr(), "{err}");
            ExitCode::from(err.exit_code())
        }
    }
}

/// Loads configuration and dispatches; returns whether all checks passed.
fn run(cli: Cli, out: &mut dyn Write) -> CliResult<bool> {
    let config = ProofPackConfig::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Verify(command) => command_verify(&command, &config, out),
        Commands::Baseline(args) => command_baseline(args, &config, out),
    }
}

// ============================================================================
// SECTION: Verify Command
// ============================================================================

/// Executes `verify`.
fn command_verify(
    command: &VerifyCommand,
    config: &ProofPackConfig,
    out: &mut dyn Write,
) -> CliResult<bool> {
    let store = FileArtifactStore::open(&command.run_dir)?;
    let strict = command.strict || config.verify.strict;
    let result = ProofPackVerifier::new()
        .with_limits(config.limits.to_limits())
        .with_audit(config.audit.build_sink()?)
        .verify(&store, "", strict)?;
    write_json(out, &result)?;
    Ok(result.valid)
}

// ============================================================================
// SECTION: Baseline Commands
// ============================================================================

/// Executes a `baseline` subcommand.
fn command_baseline(
    args: BaselineArgs,
    config: &ProofPackConfig,
    out: &mut dyn Write,
) -> CliResult<bool> {
    let audit = config.audit.build_sink()?;
    let root = config.baselines.root.as_str();
    match args.command {
        BaselineCommand::Register(command) => {
            let store = FileArtifactStore::create(&args.store)?;
            let mut service = BaselineService::open(store, root)?.with_audit(audit);
            let registration = build_registration(&command, config)?;
            let entry = service.register(registration)?;
            write_json(out, &entry)?;
            Ok(true)
        }
        BaselineCommand::List => {
            let service = open_service(&args.store, root, audit)?;
            write_json(
                out,
                &BaselineListOutput {
                    baselines: service.list(),
                },
            )?;
            Ok(true)
        }
        BaselineCommand::Check(command) => {
            let service = open_service(&args.store, root, audit)?;
            let report = service.check_integrity(&parse_version(&command.version)?)?;
            write_json(out, &report)?;
            Ok(report.valid)
        }
        BaselineCommand::Certify(command) => {
            let service = open_service(&args.store, root, audit)?;
            let report = service.certify(&parse_version(&command.version)?)?;
            write_json(out, &report)?;
            Ok(report.certified)
        }
    }
}

/// JSON shape printed by `baseline list`.
#[derive(Serialize)]
struct BaselineListOutput<'a> {
    /// Registered baselines in registration order.
    baselines: &'a [proofpack_core::BaselineEntry],
}

/// Opens the baseline registry in an existing store directory.
fn open_service(
    store_dir: &Path,
    root: &str,
    audit: Arc<dyn AuditSink>,
) -> CliResult<BaselineService<FileArtifactStore>> {
    let store = FileArtifactStore::open(store_dir)?;
    Ok(BaselineService::open(store, root)?.with_audit(audit))
}

/// Builds a registration from arguments, intent files, and configuration.
fn build_registration(
    command: &RegisterCommand,
    config: &ProofPackConfig,
) -> CliResult<BaselineRegistration> {
    let version = parse_version(&command.version)?;
    let thresholds = config.numeric_thresholds().cloned().ok_or_else(|| {
        CliError::Usage("registering a baseline requires [drift.numeric] thresholds".to_string())
    })?;
    let created_at = match &command.created_at {
        Some(value) => Timestamp::parse(value).map_err(|err| CliError::Usage(err.to_string()))?,
        None => now_timestamp()?,
    };
    let intents = command
        .intents
        .iter()
        .map(|intent| Ok(IntentRecord::new(intent.id.clone(), read_intent(&intent.path)?)))
        .collect::<CliResult<Vec<_>>>()?;
    Ok(BaselineRegistration {
        version,
        created_at,
        intents,
        thresholds,
        certified: command.certified,
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a baseline version argument.
fn parse_version(value: &str) -> CliResult<BaselineVersion> {
    BaselineVersion::parse(value).map_err(|err| CliError::Usage(err.to_string()))
}

/// Returns the current time as a timestamp.
fn now_timestamp() -> CliResult<Timestamp> {
    let millis = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
    let millis = i64::try_from(millis).unwrap_or(i64::MAX);
    Timestamp::from_unix_millis(millis).map_err(|err| CliError::Failed(err.to_string()))
}

/// Reads and parses an intent JSON document under the size limit.
fn read_intent(path: &Path) -> CliResult<Value> {
    let display = path.display();
    let file = File::open(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            CliError::NotFound(format!("intent file {display}"))
        } else {
            CliError::Failed(format!("intent file {display}: {err}"))
        }
    })?;
    let mut bytes = Vec::new();
    file.take(MAX_INTENT_FILE_BYTES.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|err| CliError::Failed(format!("intent file {display}: {err}")))?;
    if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > MAX_INTENT_FILE_BYTES {
        return Err(CliError::Usage(format!("intent file {display} exceeds size limit")));
    }
    serde_json::from_slice(&bytes)
        .map_err(|err| CliError::Usage(format!("intent file {display}: {err}")))
}

/// Writes a value as pretty JSON followed by a newline.
fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> CliResult<()> {
    let text =
        serde_json::to_string_pretty(value).map_err(|err| CliError::Output(err.to_string()))?;
    writeln!(out, "{text}").map_err(|err| CliError::Output(err.to_string()))
}
