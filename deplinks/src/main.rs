use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use deplinks::cancellation::CancellationToken;
use deplinks::config::ScanConfig;
use deplinks::pipeline::{BatchReport, DependencyPipeline, ProjectStatus};
use deplinks::sink::CsvSink;
use deplinks::source::{JsonFileSource, SearchSource};

const PASSWORD_ENV: &str = "DEPLINKS_PASSWORD";

#[derive(Parser, Debug)]
#[command(name = "deplinks")]
#[command(about = "Dependency report for bounded contexts", long_about = None)]
#[command(version)]
struct Cli {
    /// Project keys to scan (prompted for when omitted)
    keys: Vec<String>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the CSV artifacts are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Keep links that match no service keyword
    #[arg(long)]
    include_external: bool,

    /// Read `<KEY>.json` exports from this directory instead of querying Bitbucket
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Bitbucket Server base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Bitbucket user name (password from DEPLINKS_PASSWORD or a prompt)
    #[arg(short, long)]
    username: Option<String>,

    /// Seconds to wait for one project's search results
    #[arg(long)]
    timeout: Option<f64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log only warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = load_config(&cli)?;
    let keys = if cli.keys.is_empty() {
        prompt_keys()?
    } else {
        cli.keys.clone()
    };

    let source = build_source(&cli, &config)?;
    let sink = Arc::new(CsvSink::new(config.output_dir.clone()));
    let pipeline = DependencyPipeline::new(config, source, sink);

    let cancel = Arc::new(CancellationToken::new());
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel("interrupted");
            }
        });
    }

    let batch = pipeline.scan_batch(&keys, &cancel).await;
    print_summary(&batch);

    let failed = batch.with_status(ProjectStatus::Failed).count();
    if failed > 0 {
        bail!("{failed} project(s) could not be written");
    }
    Ok(())
}

fn init_tracing(cli: &Cli) {
    let default = if cli.verbose {
        "deplinks=debug"
    } else if cli.quiet {
        "deplinks=warn"
    } else {
        "deplinks=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(cli: &Cli) -> Result<ScanConfig> {
    let mut config = match &cli.config {
        Some(path) => ScanConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ScanConfig::default(),
    };

    if let Some(dir) = &cli.output_dir {
        config.output_dir.clone_from(dir);
    }
    if cli.include_external {
        config.filter_external_services = false;
    }
    if let Some(base_url) = &cli.base_url {
        config.bitbucket.base_url.clone_from(base_url);
    }
    if let Some(timeout) = cli.timeout {
        config.fetch_timeout_seconds = timeout;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn build_source(cli: &Cli, config: &ScanConfig) -> Result<Arc<dyn SearchSource>> {
    if let Some(dir) = &cli.input_dir {
        info!(dir = %dir.display(), "Reading exported search results");
        return Ok(Arc::new(JsonFileSource::new(dir.clone())));
    }
    bitbucket_source(cli, config)
}

#[cfg(feature = "bitbucket")]
fn bitbucket_source(cli: &Cli, config: &ScanConfig) -> Result<Arc<dyn SearchSource>> {
    use deplinks::source::{AnonymousAuthenticator, Authenticator, BasicAuthenticator, BitbucketSource};

    let authenticator: Arc<dyn Authenticator> = match &cli.username {
        Some(username) => {
            let password = match std::env::var(PASSWORD_ENV) {
                Ok(password) => password,
                Err(_) => prompt_password()?,
            };
            Arc::new(BasicAuthenticator::new(username.clone(), password))
        }
        None => {
            tracing::warn!("No username given, querying Bitbucket anonymously");
            Arc::new(AnonymousAuthenticator)
        }
    };

    let source = BitbucketSource::new(config, authenticator)
        .context("Failed to create Bitbucket client")?;
    Ok(Arc::new(source))
}

#[cfg(not(feature = "bitbucket"))]
fn bitbucket_source(_cli: &Cli, _config: &ScanConfig) -> Result<Arc<dyn SearchSource>> {
    bail!("built without the `bitbucket` feature; pass --input-dir")
}

fn prompt_password() -> Result<String> {
    dialoguer::Password::new()
        .with_prompt("Password")
        .allow_empty_password(true)
        .interact()
        .context("Failed to read password")
}

fn prompt_keys() -> Result<Vec<String>> {
    let line: String = dialoguer::Input::new()
        .with_prompt("Project key(s), separated by spaces (ex: ESB REAL RR)")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read project keys")?;
    Ok(split_keys(&line))
}

fn split_keys(line: &str) -> Vec<String> {
    line.split_whitespace().map(String::from).collect()
}

fn print_summary(batch: &BatchReport) {
    for project in &batch.projects {
        match (&project.status, &project.artifacts) {
            (ProjectStatus::Skipped, _) => println!("{}: skipped", project.project_key),
            (_, Some(artifacts)) => println!(
                "{}: {} link(s). Saved as: {} and {}",
                project.project_key,
                project.kept(),
                artifacts.frame.display(),
                artifacts.pivot.display()
            ),
            (_, None) => println!(
                "{}: not saved ({})",
                project.project_key,
                project.sink_error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keys() {
        assert_eq!(split_keys(" ESB  REAL\tRR \n"), vec!["ESB", "REAL", "RR"]);
        assert!(split_keys("   ").is_empty());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "deplinks",
            "REAL",
            "--include-external",
            "--timeout",
            "5",
            "--base-url",
            "https://bitbucket.example.com",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(cli.keys, vec!["REAL"]);
        assert!(!config.filter_external_services);
        assert!((config.fetch_timeout_seconds - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.bitbucket.base_url, "https://bitbucket.example.com");
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let cli = Cli::parse_from(["deplinks", "--timeout=-1"]);
        assert!(load_config(&cli).is_err());
    }
}
