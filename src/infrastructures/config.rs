use crate::application::use_cases::build_growth_report::DEFAULT_MIN_STARS_LAST_YEAR;
use crate::application::use_cases::fetch_repository_info::{
    DEFAULT_COOLDOWN_SECONDS, DEFAULT_MAX_ATTEMPTS, RetryPolicy,
};
use crate::domain::models::repository::RepositoryIdentifier;
use crate::infrastructures::adapters::secondary::external_apis::github::DEFAULT_GITHUB_API_URL;
use crate::infrastructures::adapters::secondary::storage::json_result_cache::DEFAULT_CACHE_PATH;
use crate::infrastructures::adapters::secondary::storage::report_file::DEFAULT_REPORT_PATH;
use crate::infrastructures::adapters::secondary::storage::star_events_file;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Workers fetching repository metadata at the same time
pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GitHub token must not be empty")]
    EmptyToken,

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("max attempts must be at least 1")]
    ZeroMaxAttempts,
}

/// Report star growth and GitHub metadata for popular repositories.
#[derive(Debug, Parser)]
#[command(name = "repo-growth", version)]
pub struct Cli {
    /// GitHub access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_GITHUB_API_URL)]
    pub api_url: String,

    /// Number of concurrent metadata workers
    #[arg(long, short = 'j', default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Result cache location
    #[arg(long, env = "REPO_GROWTH_CACHE", default_value = DEFAULT_CACHE_PATH)]
    pub cache: PathBuf,

    /// Fetch everything and leave the result cache untouched
    #[arg(long)]
    pub no_cache: bool,

    /// Seconds to wait after hitting the rate limit
    #[arg(long, default_value_t = DEFAULT_COOLDOWN_SECONDS)]
    pub cooldown_secs: u64,

    /// Lookups per repository before giving up on a rate limit
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Star events exported from the analytics warehouse
    #[arg(long, default_value = star_events_file::DEFAULT_STAR_EVENTS_PATH)]
    pub star_events: PathBuf,

    /// Report on these repositories instead of selecting them by stars
    #[arg(long = "repo", value_name = "OWNER/NAME")]
    pub repos: Vec<RepositoryIdentifier>,

    /// Stars required over the last year to be selected
    #[arg(long, default_value_t = DEFAULT_MIN_STARS_LAST_YEAR)]
    pub min_stars_last_year: u64,

    /// Report output file
    #[arg(long, short, default_value = DEFAULT_REPORT_PATH)]
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub github_token: String,
    pub github_api_url: String,
    pub concurrency: usize,
    pub cache_path: Option<PathBuf>,
    pub retry_policy: RetryPolicy,
    pub star_events_path: PathBuf,
    pub repositories: Option<Vec<RepositoryIdentifier>>,
    pub min_stars_last_year: u64,
    pub output_path: PathBuf,
}

impl TryFrom<Cli> for AppConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        if cli.token.trim().is_empty() {
            return Err(ConfigError::EmptyToken);
        }
        if cli.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if cli.max_attempts == 0 {
            return Err(ConfigError::ZeroMaxAttempts);
        }

        Ok(Self {
            github_token: cli.token.trim().to_string(),
            github_api_url: cli.api_url,
            concurrency: cli.concurrency,
            cache_path: (!cli.no_cache).then_some(cli.cache),
            retry_policy: RetryPolicy {
                cooldown: Duration::from_secs(cli.cooldown_secs),
                max_attempts: cli.max_attempts,
            },
            star_events_path: cli.star_events,
            repositories: (!cli.repos.is_empty()).then_some(cli.repos),
            min_stars_last_year: cli.min_stars_last_year,
            output_path: cli.output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("repo-growth").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() -> anyhow::Result<()> {
        let cli = parse(&["--token", "abc", "--api-url", DEFAULT_GITHUB_API_URL])?;
        let config = AppConfig::try_from(cli)?;

        assert_eq!(config.github_token, "abc");
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.retry_policy, RetryPolicy::default());
        assert_eq!(config.min_stars_last_year, 1000);
        assert!(config.repositories.is_none());
        assert!(config.cache_path.is_some());
        Ok(())
    }

    #[test]
    fn test_explicit_repositories_and_no_cache() -> anyhow::Result<()> {
        let config = AppConfig::try_from(parse(&[
            "--token",
            "abc",
            "--repo",
            "a/b",
            "--repo",
            "c/d",
            "--no-cache",
            "-j",
            "2",
            "--cooldown-secs",
            "5",
            "--max-attempts",
            "3",
        ])?)?;

        assert_eq!(config.repositories.map(|r| r.len()), Some(2));
        assert!(config.cache_path.is_none());
        assert_eq!(config.concurrency, 2);
        assert_eq!(
            config.retry_policy,
            RetryPolicy {
                cooldown: Duration::from_secs(5),
                max_attempts: 3
            }
        );
        Ok(())
    }

    #[test]
    fn test_malformed_repository_argument_is_rejected() {
        assert!(parse(&["--token", "abc", "--repo", "not-a-repo"]).is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() -> anyhow::Result<()> {
        assert_eq!(
            AppConfig::try_from(parse(&["--token", "abc", "-j", "0"])?).err(),
            Some(ConfigError::ZeroConcurrency)
        );
        assert_eq!(
            AppConfig::try_from(parse(&["--token", "abc", "--max-attempts", "0"])?).err(),
            Some(ConfigError::ZeroMaxAttempts)
        );
        assert_eq!(
            AppConfig::try_from(parse(&["--token", "  "])?).err(),
            Some(ConfigError::EmptyToken)
        );
        Ok(())
    }
}
