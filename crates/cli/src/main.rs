use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use config::{ServiceConfig, SURVEY_DIR_ENV};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use survey_index::{ShutdownSignal, SurveyIndex};

mod config;
mod http_api;

#[derive(Parser)]
#[command(name = "survey-provider")]
#[command(about = "Serve survey definitions indexed from a directory tree", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the survey definitions
    #[arg(long, global = true, env = SURVEY_DIR_ENV)]
    dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the survey listing over HTTP
    Serve(ServeArgs),

    /// Print every indexed survey, ordered by id
    List(ListArgs),

    /// Print the raw definition of one survey
    Get(IdArgs),

    /// Print the file backing one survey
    Resolve(IdArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address, e.g. 127.0.0.1:8080 (defaults to 0.0.0.0:$PORT)
    #[arg(long)]
    bind: Option<String>,
}

#[derive(Args)]
struct ListArgs {
    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct IdArgs {
    /// Survey id as shown by `list`
    id: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // stdout carries data for these commands
    let data_on_stdout = match &cli.command {
        Commands::List(args) => args.json,
        Commands::Get(_) => true,
        _ => false,
    };
    if data_on_stdout {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let dir = cli
        .dir
        .with_context(|| format!("Survey directory not set: pass --dir or {SURVEY_DIR_ENV}"))?;

    match cli.command {
        Commands::Serve(args) => serve(ServiceConfig::resolve(dir, args.bind)?).await?,
        Commands::List(args) => run_list(dir, args).await?,
        Commands::Get(args) => run_get(dir, args).await?,
        Commands::Resolve(args) => run_resolve(dir, args).await?,
    }

    Ok(())
}

fn print_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(bytes)
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

async fn build_index(dir: PathBuf, shutdown: ShutdownSignal) -> Result<Arc<SurveyIndex>> {
    let index = Arc::new(SurveyIndex::with_shutdown(&dir, shutdown)?);
    let building = Arc::clone(&index);
    let stats = tokio::task::spawn_blocking(move || building.rebuild())
        .await
        .context("join index rebuild")?
        .with_context(|| format!("Unable to read dir '{}'", dir.display()))?;
    log::info!(
        "Loaded {} surveys from {} in {} ms",
        stats.surveys,
        dir.display(),
        stats.time_ms
    );
    Ok(index)
}

async fn run_list(dir: PathBuf, args: ListArgs) -> Result<()> {
    let index = build_index(dir, ShutdownSignal::new()).await?;
    let list = index.list();

    if args.json {
        return print_stdout(serde_json::to_string_pretty(&list)?.as_bytes());
    }

    let mut lines = Vec::with_capacity(list.len());
    for entry in &list {
        lines.push(format!("{}\t{}\t{}", entry.id, entry.label, entry.study));
    }
    print_stdout(lines.join("\n").as_bytes())
}

async fn run_get(dir: PathBuf, args: IdArgs) -> Result<()> {
    let index = build_index(dir, ShutdownSignal::new()).await?;
    let bytes = index.fetch(&args.id)?;
    print_stdout(&bytes)
}

async fn run_resolve(dir: PathBuf, args: IdArgs) -> Result<()> {
    let index = build_index(dir, ShutdownSignal::new()).await?;
    let path = index.resolve(&args.id)?;
    print_stdout(path.display().to_string().as_bytes())
}

async fn serve(config: ServiceConfig) -> Result<()> {
    let shutdown = ShutdownSignal::new();
    let index = build_index(config.survey_dir.clone(), shutdown.clone()).await?;
    let app = http_api::router(index);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    log::info!("Serving surveys on http://{}", config.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_on_ctrl_c(shutdown))
        .await?;
    Ok(())
}

async fn shutdown_on_ctrl_c(shutdown: ShutdownSignal) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::warn!("Unable to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
    shutdown.raise();
}
