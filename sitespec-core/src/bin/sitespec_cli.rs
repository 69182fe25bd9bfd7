//! SiteSpec CLI - Bridge interface for the generation service
//!
//! Commands: templates, validate, compile, diff, commit
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on validation failure or a stale revision, 1 on any other error

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use sitespec_core::{
    Build, FileRevisionStore, PipelineError, ProjectId, RenderRegistry, Revision, SitePipeline, SiteSpec,
    TemplateRegistry,
};

const EXIT_REJECTED: u8 = 2;

#[derive(Parser)]
#[command(name = "sitespec-cli")]
#[command(about = "SiteSpec CLI - Site Specification Compiler", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory of template override files (JSON)
    #[arg(short, long, global = true, env = "SITESPEC_TEMPLATES_DIR", default_value = "templates")]
    templates_dir: PathBuf,

    /// Log at debug level unless SITESPEC_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct Input {
    /// SiteSpec JSON given inline
    #[arg(short, long, conflicts_with = "file")]
    payload: Option<String>,

    /// SiteSpec JSON read from a file
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available template families
    Templates,

    /// Validate a SiteSpec document
    Validate {
        #[command(flatten)]
        input: Input,
    },

    /// Validate, normalize and compile a SiteSpec document
    Compile {
        #[command(flatten)]
        input: Input,

        /// Previous revision (JSON) to keep section ids stable against
        #[arg(long)]
        previous: Option<PathBuf>,

        /// Write every page and revision.json under this directory
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Section patches between two normalized SiteSpecs
    Diff {
        /// Previous SiteSpec (JSON file)
        #[arg(long)]
        previous: PathBuf,

        /// Next SiteSpec (JSON file)
        #[arg(long)]
        next: PathBuf,
    },

    /// Build against the latest stored revision and commit the result
    Commit {
        #[command(flatten)]
        input: Input,

        /// Project id (UUID)
        #[arg(long)]
        project: ProjectId,

        /// Revision store root
        #[arg(long, env = "SITESPEC_STORE_DIR", default_value = ".sitespec")]
        store_dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("{}", e);
    }

    let templates = match TemplateRegistry::load_from_dir(&cli.templates_dir) {
        Ok(r) => r,
        Err(e) => return fail(format!("Failed to load templates: {}", e)),
    };

    let pipeline = SitePipeline::new(templates, RenderRegistry::builtin());

    match cli.command {
        Commands::Templates => {
            let templates: Vec<_> = pipeline
                .list_templates()
                .iter()
                .map(|t| {
                    json!({
                        "slug": t.slug,
                        "name": t.name,
                        "description": t.description,
                        "version": t.template_version,
                        "deprecated": t.deprecated,
                    })
                })
                .collect();
            emit(&templates, ExitCode::SUCCESS)
        }

        Commands::Validate { input } => {
            let raw = match input.read() {
                Ok(raw) => raw,
                Err(e) => return fail(e),
            };
            let result = pipeline.validate_str(&raw);
            let code = if result.is_valid() { ExitCode::SUCCESS } else { ExitCode::from(EXIT_REJECTED) };
            emit(&result, code)
        }

        Commands::Compile { input, previous, out_dir } => {
            let raw = match input.read().and_then(|raw| parse_json::<Value>(&raw)) {
                Ok(raw) => raw,
                Err(e) => return fail(e),
            };
            let previous = match previous.map(|path| read_json::<Revision>(&path)).transpose() {
                Ok(previous) => previous,
                Err(e) => return fail(e),
            };

            match pipeline.build(&raw, previous.as_ref()) {
                Ok(build) => {
                    if let Some(dir) = out_dir {
                        if let Err(e) = write_bundle(&dir, &build) {
                            return fail(format!("Failed to write {}: {}", dir.display(), e));
                        }
                    }
                    emit(&json!({ "success": true, "build": build }), ExitCode::SUCCESS)
                }
                Err(e) => rejected(e),
            }
        }

        Commands::Diff { previous, next } => {
            let specs = read_json::<SiteSpec>(&previous).and_then(|p| read_json::<SiteSpec>(&next).map(|n| (p, n)));
            match specs {
                Ok((previous, next)) => emit(&pipeline.diff(&previous, &next), ExitCode::SUCCESS),
                Err(e) => fail(e),
            }
        }

        Commands::Commit { input, project, store_dir } => {
            let raw = match input.read().and_then(|raw| parse_json::<Value>(&raw)) {
                Ok(raw) => raw,
                Err(e) => return fail(e),
            };
            let store = match FileRevisionStore::open(&store_dir) {
                Ok(store) => store,
                Err(e) => return fail(format!("Failed to open store: {}", e)),
            };

            match pipeline.regenerate(&store, project, &raw) {
                Ok(build) => emit(
                    &json!({
                        "success": true,
                        "projectId": project,
                        "revisionId": build.revision.revision_id,
                        "bundleHash": build.revision.bundle_hash,
                        "patches": build.patches,
                        "fullRender": build.full_render,
                        "warnings": build.revision.warnings().collect::<Vec<_>>(),
                    }),
                    ExitCode::SUCCESS,
                ),
                Err(e) => rejected(e),
            }
        }
    }
}

fn init_tracing(verbose: bool) -> Result<(), String> {
    let level = if verbose { "debug" } else { "warn" };

    let filter = tracing_subscriber::EnvFilter::try_from_env("SITESPEC_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| format!("failed to initialize tracing subscriber: {error}"))
}

impl Input {
    fn read(&self) -> Result<String, String> {
        match (&self.payload, &self.file) {
            (Some(payload), _) => Ok(payload.clone()),
            (None, Some(path)) => {
                fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))
            }
            (None, None) => Err("Either --payload or --file is required".to_string()),
        }
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_str(raw).map_err(|e| format!("Invalid payload: {}", e))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let raw = fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&raw).map_err(|e| format!("Invalid JSON in {}: {}", path.display(), e))
}

fn write_bundle(dir: &Path, build: &Build) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    for artifact in &build.revision.artifacts {
        fs::write(dir.join(&artifact.path), &artifact.html)?;
    }
    let revision = serde_json::to_vec_pretty(&build.revision)?;
    fs::write(dir.join("revision.json"), revision)
}

fn emit<T: Serialize>(value: &T, code: ExitCode) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(out) => {
            println!("{}", out);
            code
        }
        Err(e) => fail(format!("Failed to serialize output: {}", e)),
    }
}

fn rejected(error: PipelineError) -> ExitCode {
    let code = match &error {
        PipelineError::Schema(_) => ExitCode::from(EXIT_REJECTED),
        e if e.is_stale() => ExitCode::from(EXIT_REJECTED),
        _ => ExitCode::FAILURE,
    };
    let output = json!({
        "success": false,
        "error": error.to_string(),
        "issues": error.issues(),
    });
    emit(&output, code)
}

fn fail(message: impl Into<String>) -> ExitCode {
    let output = json!({ "success": false, "error": message.into() });
    println!("{}", output);
    ExitCode::FAILURE
}
