use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{ArgAction, Parser};
use tracing::{info, warn};

use upstream_check::catalog::CatalogSource;
use upstream_check::config::{CheckerConfig, ReleaseSource, TOKEN_ENV_VAR, db_path};
use upstream_check::logging;
use upstream_check::pipeline::{Checker, DecisionWriter, OutputFormat, RunOutcome};
use upstream_check::version::cache::ResponseCache;
use upstream_check::version::http::GitHubHttpClient;
use upstream_check::version::registries::GitHubFetcher;
use upstream_check::version::timer::TokioTimer;

/// Exit status after Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "upstream-check")]
#[command(
    version,
    about = "Report packages whose GitHub upstream has a newer stable release"
)]
struct Cli {
    /// Catalog JSON file, or `-` for stdin
    #[arg(long, value_name = "PATH", required_unless_present = "catalog_cmd")]
    catalog: Option<String>,

    /// Shell command printing the catalog JSON
    #[arg(long, value_name = "COMMAND", conflicts_with = "catalog")]
    catalog_cmd: Option<String>,

    /// Configuration file (defaults to $XDG_CONFIG_HOME/upstream-check/config.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// File containing `username:token`, used when API_TOKEN is not set
    #[arg(long, value_name = "PATH")]
    token_file: Option<PathBuf>,

    /// Do not read or write the response cache
    #[arg(long)]
    no_cache: bool,

    /// Keep going when a repository cannot be fetched
    #[arg(long)]
    isolate_failures: bool,

    /// Only consult /releases/latest instead of paging through all releases
    #[arg(long)]
    latest_endpoint: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
    format: OutputFormat,

    /// Also write JSON logs to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// More diagnostics (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn catalog_source(&self) -> anyhow::Result<CatalogSource> {
        match (&self.catalog_cmd, &self.catalog) {
            (Some(command), _) => Ok(CatalogSource::Command(command.clone())),
            (None, Some(arg)) => Ok(CatalogSource::from_arg(arg)),
            (None, None) => bail!("Either --catalog or --catalog-cmd is required"),
        }
    }

    /// Flags win over the configuration file
    fn apply_overrides(&self, config: &mut CheckerConfig) {
        if let Some(token_file) = &self.token_file {
            config.token_file = Some(token_file.clone());
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
        if self.isolate_failures {
            config.isolate_failures = true;
        }
        if self.latest_endpoint {
            config.release_source = ReleaseSource::Latest;
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let _guard = logging::init(cli.verbose, cli.quiet, cli.log_file.as_deref())
        .context("Failed to set up logging")?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config =
        CheckerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);

    let records = cli
        .catalog_source()?
        .load()
        .await
        .context("Failed to load catalog")?;

    let credentials = config.credentials().context("Failed to load credentials")?;
    if credentials.is_none() {
        warn!(
            "{} is not set, requests are unauthenticated and limited to 60 per hour",
            TOKEN_ENV_VAR
        );
    }

    let cache = if config.cache.enabled {
        let dir = config.cache_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
        Some(Arc::new(
            ResponseCache::new(&db_path(&dir)).context("Failed to open response cache")?,
        ))
    } else {
        None
    };

    let client =
        GitHubHttpClient::new(credentials, cache).context("Failed to build HTTP client")?;
    let fetcher = GitHubFetcher::new(
        Arc::new(client),
        Arc::new(TokioTimer),
        &config.api_base_url,
    )
    .with_policy(config.retry_policy())
    .with_source(config.release_source);
    let checker = Checker::new(fetcher).with_isolated_failures(config.isolate_failures);

    let mut run = checker.run(records);
    let mut writer = DecisionWriter::new(std::io::stdout(), cli.format);

    let outcome = run.drive(&mut writer, tokio::signal::ctrl_c()).await;

    info!("Fetch stats: {}", run.stats());
    match outcome? {
        RunOutcome::Completed => Ok(ExitCode::SUCCESS),
        RunOutcome::Interrupted => Ok(ExitCode::from(EXIT_INTERRUPTED)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_requires_a_catalog() {
        assert!(Cli::try_parse_from(["upstream-check"]).is_err());
        assert!(
            Cli::try_parse_from(["upstream-check", "--catalog", "a.json", "--catalog-cmd", "x"])
                .is_err()
        );
    }

    #[test]
    fn catalog_source_prefers_command() {
        let cli = Cli::try_parse_from(["upstream-check", "--catalog-cmd", "cat a.json"]).unwrap();
        assert_eq!(
            cli.catalog_source().unwrap(),
            CatalogSource::Command("cat a.json".to_string())
        );

        let cli = Cli::try_parse_from(["upstream-check", "--catalog", "-"]).unwrap();
        assert_eq!(cli.catalog_source().unwrap(), CatalogSource::Stdin);
    }

    #[test]
    fn flags_override_configuration() {
        let cli = Cli::try_parse_from([
            "upstream-check",
            "--catalog",
            "a.json",
            "--no-cache",
            "--isolate-failures",
            "--latest-endpoint",
            "--token-file",
            "/tmp/token",
            "--format",
            "csv",
        ])
        .unwrap();
        let mut config = CheckerConfig::default();

        cli.apply_overrides(&mut config);

        assert!(!config.cache.enabled);
        assert!(config.isolate_failures);
        assert_eq!(config.release_source, ReleaseSource::Latest);
        assert_eq!(config.token_file, Some(PathBuf::from("/tmp/token")));
        assert_eq!(cli.format, OutputFormat::Csv);
    }

    #[test]
    fn flags_leave_configuration_alone_when_absent() {
        let cli = Cli::try_parse_from(["upstream-check", "--catalog", "a.json", "-vv"]).unwrap();
        let mut config = CheckerConfig::default();

        cli.apply_overrides(&mut config);

        assert_eq!(config, CheckerConfig::default());
        assert_eq!(cli.verbose, 2);
    }
}
