//! Prompt Warden CLI - Command-line interface for protected prompt integrity

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use warden_canary::token::render_echo_directive;
use warden_core::{IntegrityState, TokenVerdict, Warden, WardenConfig};

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Prompt Warden - Integrity protection for prompt templates and agent instructions")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config/warden.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Validate artifacts and restore any that were tampered with
    Validate {
        /// Artifact name (all artifacts if omitted)
        name: Option<String>,
    },
    /// Accept an artifact's current protected section as canonical
    Accept {
        /// Artifact name
        name: String,
        /// Who is approving the change
        #[arg(long = "by")]
        updated_by: String,
    },
    /// Show configured artifacts and their canonical records
    Status,
    /// Show the change log for one artifact
    History {
        /// Artifact name
        name: String,
    },
    /// Show recorded security incidents
    Incidents,
    /// Issue a round-trip token and print its echo directive
    Issue {
        /// Artifact name
        name: String,
    },
    /// Check a captured model response for a round-trip token
    Check {
        /// Artifact whose prompt carried the token
        #[arg(long)]
        artifact: String,
        /// Expected token value
        #[arg(long)]
        token: String,
        /// Response file, or "-" for stdin
        #[arg(long)]
        response: PathBuf,
        /// Model identifier recorded on failure
        #[arg(long, default_value = "unknown")]
        model: String,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_response(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading response from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading response {}", path.display()))
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let config = WardenConfig::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    let warden = Warden::new(config).context("initializing warden")?;

    match cli.command {
        Commands::Validate { name } => {
            let outcomes = match name {
                Some(name) => vec![warden.validate_and_fix(&name)?],
                None => warden.validate_all()?,
            };

            let mut failed = false;
            for outcome in &outcomes {
                println!("{}", outcome);
                failed |= outcome.state == IntegrityState::RestoreFailed;
            }
            tracing::debug!(checked = outcomes.len(), failed, "Validation run finished");
            if failed {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Accept { name, updated_by } => {
            let outcome = warden.accept_as_canonical(&name, &updated_by)?;
            println!("{}", outcome);
        }
        Commands::Status => {
            for artifact in &warden.config().artifacts {
                match warden.canonical_record(&artifact.name)? {
                    Some(record) => println!(
                        "{:<28} {}  updated {} by {}",
                        artifact.name,
                        record.canonical_digest.short(),
                        record.updated_at.to_rfc3339(),
                        record.updated_by
                    ),
                    None => println!("{:<28} (unregistered)", artifact.name),
                }
            }
        }
        Commands::History { name } => {
            for entry in warden.history(&name)? {
                println!("{}", serde_json::to_string(&entry)?);
            }
        }
        Commands::Incidents => {
            for incident in warden.incidents()? {
                println!("{}", serde_json::to_string(&incident)?);
            }
        }
        Commands::Issue { name } => {
            let token = warden.issue_token(&name)?;
            println!("{}", token.value());
            println!();
            println!("{}", render_echo_directive(&token));
        }
        Commands::Check {
            artifact,
            token,
            response,
            model,
        } => {
            let response = read_response(&response)?;
            match warden.check_response_value(&artifact, &token, &response, &model)? {
                TokenVerdict::Ok => println!("ok"),
                TokenVerdict::Incident(incident) => {
                    println!(
                        "untrusted response: {} (incident {})",
                        incident.incident_type, incident.incident_id
                    );
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
