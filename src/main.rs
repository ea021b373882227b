use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use image_mirror::commands::{self, App};
use image_mirror::config::{DEFAULT_LATEST_VARIANT, MirrorConfig, token_from_env};
use image_mirror::error::SyncError;
use image_mirror::platform::check_platform;
use image_mirror::sync::latest::LatestOutcome;

#[derive(Parser)]
#[command(name = "image-mirror")]
#[command(version, about = "Mirror versioned container images into a single destination repository")]
struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/image-mirror/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the upstream versions each variant still needs
    Discover {
        #[arg(long, default_value = "all")]
        variant: String,
        /// Treat every upstream version as unmirrored
        #[arg(long)]
        force_full_sync: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        output_format: OutputFormat,
    },
    /// Mirror one upstream version under its full, minor and major tags
    Mirror {
        #[arg(long)]
        variant: String,
        #[arg(long)]
        version: String,
        /// Image used when upstream only has a schema1 manifest
        #[arg(long)]
        placeholder: Option<String>,
    },
    /// Point `<variant>-latest` and `<variant>` at the newest mirrored version
    UpdateLatest {
        #[arg(long, default_value = "all")]
        variant: String,
    },
    /// Print the newest upstream version of a variant
    Latest {
        #[arg(long, default_value = DEFAULT_LATEST_VARIANT)]
        variant: String,
    },
    /// Discover, mirror and update floating tags in one run
    Sync {
        #[arg(long, default_value = "all")]
        variant: String,
        #[arg(long)]
        force_full_sync: bool,
    },
    /// Print whether an image manifest supports a platform
    CheckPlatform {
        /// Platform as os/architecture, e.g. linux/amd64
        #[arg(long)]
        platform: String,
        /// JSON produced by `docker buildx imagetools inspect --format '{{json .}}'`
        #[arg(long)]
        inspect_json: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Github,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match init_logging(cli.log_format, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error[config-error]: {:#}", e);
            return ExitCode::from(2);
        }
    };

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(anyhow::Error::from)
        .and_then(|runtime| runtime.block_on(run(cli)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<SyncError>() {
            Some(sync_error) => {
                let kind = sync_error.kind();
                eprintln!("error[{}]: {}", kind, sync_error);
                ExitCode::from(kind.exit_code())
            }
            None => {
                eprintln!("error: {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn init_logging(format: LogFormat, log_file: Option<&Path>) -> anyhow::Result<WorkerGuard> {
    let (writer, guard) = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    Ok(guard)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Command::CheckPlatform {
        platform,
        inspect_json,
    } = &cli.command
    {
        let supported = check_platform(platform, inspect_json).map_err(SyncError::from)?;
        println!("{}", supported);
        return Ok(());
    }

    let config = MirrorConfig::load(cli.config.as_deref()).map_err(SyncError::from)?;
    let token = token_from_env();
    if token.is_none() {
        warn!("No destination token found in GH_TOKEN or REGISTRY_TOKEN");
    }
    let app = App::from_config(config, token)?;

    match cli.command {
        Command::Discover {
            variant,
            force_full_sync,
            output_format,
        } => {
            let discovered = app
                .discover(&variant, force_full_sync)
                .await
                .map_err(SyncError::from)?;
            let table = app.discovery_table(&discovered);

            match output_format {
                OutputFormat::Json => println!("{}", commands::render_json(&table)?),
                OutputFormat::Github => {
                    if let Some(path) = std::env::var_os("GITHUB_OUTPUT") {
                        commands::write_github_output(Path::new(&path), &table)?;
                    }
                    println!("{}", commands::render_github(&table)?);
                }
            }

            first_error(discovered.into_first_error())
        }
        Command::Mirror {
            variant,
            version,
            placeholder,
        } => {
            let job = app.mirror(&variant, &version, placeholder).await?;
            println!("{}", job.tags.to_vec().join(" "));
            Ok(())
        }
        Command::UpdateLatest { variant } => {
            let outcomes = app.update_latest(&variant).await.map_err(SyncError::from)?;
            for (name, outcome) in outcomes.successes() {
                match outcome {
                    LatestOutcome::Updated { tags, floating, .. } => {
                        println!("{}: {} -> {}", name, floating.join(", "), tags.full)
                    }
                    LatestOutcome::NoOp => println!("{}: no versions mirrored", name),
                }
            }
            first_error(outcomes.into_first_error())
        }
        Command::Latest { variant } => {
            let version = app.latest(&variant).await?;
            println!("{}", version);
            Ok(())
        }
        Command::Sync {
            variant,
            force_full_sync,
        } => {
            let reports = app
                .sync(&variant, force_full_sync)
                .await
                .map_err(SyncError::from)?;
            for (name, report) in reports.successes() {
                info!("{}: mirrored {} versions", name, report.mirrored.len());
                let mirrored: Vec<_> = report.mirrored.iter().map(|v| v.raw.as_str()).collect();
                println!("{}: {}", name, serde_json::to_string(&mirrored)?);
            }
            first_error(reports.into_first_error())
        }
        Command::CheckPlatform { .. } => Ok(()),
    }
}

fn first_error(error: Option<SyncError>) -> anyhow::Result<()> {
    match error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
