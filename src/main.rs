mod app;
mod config;
mod error;
mod github;
mod logging;
mod progress;
mod render;
#[cfg(test)]
mod test_utils;
mod timefmt;
mod triage;

use clap::Parser;
use config::{Backend, CliOverrides, Config};
use error::{Result, TriageError};
use github::client::OctocrabGateway;
use github::gateway::Gateway;
use github::gh_cli::GhCliGateway;
use github::identity::{ConfiguredProfiles, GitConfigProfiles, IdentityScope, ProfileLookup};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "fork-triage",
    about = "Sort your GitHub forks into maintained, contribution and untouched"
)]
struct Cli {
    #[arg(long = "as", value_name = "PROFILE", help = "Run as an identity profile")]
    profile: Option<String>,

    #[arg(long, short, help = "Show all forks (default: hide untouched)")]
    all: bool,

    #[arg(long, help = "Output as JSON")]
    json: bool,

    #[arg(long, help = "Bypass cached PRs (the cache is still refreshed)")]
    no_cache: bool,

    #[arg(long, short, help = "Verbose logging")]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = Config::load(CliOverrides {
        show_all: cli.all,
        no_cache: cli.no_cache,
    });
    tracing::debug!(?config, "configuration loaded");

    if let Err(e) = run(&cli, &config).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: &Cli, config: &Config) -> Result<()> {
    let gateway = Arc::new(build_gateway(cli.profile.as_deref(), config)?);

    let options = app::RunOptions {
        show_all: config.show_all,
        bypass_cache_reads: config.no_cache,
        cache_dir: config.resolved_cache_dir(),
        progress_tick: Some(Duration::from_millis(config.progress_tick_ms)),
    };

    let report = app::run(gateway, &options).await?;
    if report.enumerated == 0 {
        println!("No forks found.");
        return Ok(());
    }
    eprintln!("✓ Analyzed {} forks\n", report.analyzed());

    if cli.json {
        println!("{}", render::to_json(&report.forks)?);
    } else {
        print!("{}", render::to_text(&report.forks));
    }
    Ok(())
}

fn build_gateway(profile: Option<&str>, config: &Config) -> Result<Gateway> {
    match (config.backend, profile) {
        (Backend::Token, Some(_)) => Err(TriageError::Config(
            "--as needs the gh backend; set backend = \"gh\"".to_string(),
        )),
        (Backend::Token, None) => {
            let token = config
                .github_token
                .as_deref()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    TriageError::Config(
                        "backend \"token\" needs github_token or GITHUB_TOKEN".to_string(),
                    )
                })?;
            Ok(Gateway::Token(OctocrabGateway::new(token)?))
        }
        (Backend::Gh, Some(name)) => {
            let profile =
                ConfiguredProfiles::new(&config.profiles, GitConfigProfiles).lookup(name)?;
            let scope = IdentityScope::materialize(&profile)?;
            let gateway = GhCliGateway::with_identity(&config.gh_program, name, scope);
            Ok(Gateway::Cli(gateway))
        }
        (Backend::Gh, None) => Ok(Gateway::Cli(GhCliGateway::new(&config.gh_program))),
    }
}
