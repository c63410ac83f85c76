//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The TOML file is optional; everything it holds can also be given on the
//! command line. Client secrets are never logged: they are held as
//! `Secret<String>` from the moment they are parsed.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use common::{Error, Secret};
use provider::{ClientCredentials, QuerySpec, TweetMode};
use search_poller::machine::{DEFAULT_BACKOFF, DEFAULT_MAX_RETRIES};
use search_poller::{Limits, RetryPolicy};
use serde::Deserialize;

/// Default Kafka topic for relayed records.
pub const DEFAULT_TOPIC: &str = "ingest.twitter";

/// Default page size, also the upstream maximum.
pub const DEFAULT_COUNT: u32 = 100;

const DEFAULT_MESSAGE_TIMEOUT_MS: u64 = 5000;
const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Command line arguments. Flags with an `env` name fall back to that
/// environment variable.
#[derive(Debug, Parser)]
#[command(
    name = "tweet-relay",
    version,
    about = "Relay Twitter search results to a Kafka topic"
)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short = 'c', long = "config", env = "CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Comma-separated Kafka bootstrap servers
    #[arg(short = 'b', long, env = "KAFKA_BROKERS")]
    pub kafka_brokers: Option<String>,

    /// Kafka topic [default: ingest.twitter]
    #[arg(short = 't', long, env = "KAFKA_TOPIC")]
    pub topic: Option<String>,

    /// Twitter consumer key; repeat or comma-separate for several apps
    #[arg(
        short = 'k',
        long,
        env = "TWITTER_CLIENT_ID",
        value_delimiter = ','
    )]
    pub twitter_client_id: Vec<String>,

    /// Twitter consumer secret, paired with the key at the same position
    #[arg(
        short = 's',
        long,
        env = "TWITTER_CLIENT_SECRET",
        value_delimiter = ',',
        hide_env_values = true
    )]
    pub twitter_client_secret: Vec<String>,

    /// Search terms
    #[arg(short = 'q', long)]
    pub query: Option<String>,

    /// Restrict results to a language code (e.g. "en")
    #[arg(short = 'l', long)]
    pub lang: Option<String>,

    /// Restrict results to "latitude,longitude,radius"
    #[arg(short = 'g', long)]
    pub geocode: Option<String>,

    /// Records per page, 1 to 100 [default: 100]
    #[arg(long)]
    pub count: Option<u32>,

    /// Stop after this many records; 0 is unlimited
    #[arg(long)]
    pub limit: Option<u64>,

    /// Stop once the cursor reaches this id; 0 is unset
    #[arg(long)]
    pub max_id: Option<u64>,

    /// Only return records newer than this id; 0 is unset
    #[arg(long)]
    pub since_id: Option<u64>,

    /// "extended" or "compat" [default: extended]
    #[arg(long)]
    pub tweet_mode: Option<TweetMode>,

    /// Also append raw records to this JSON lines file
    #[arg(long)]
    pub output_json: Option<PathBuf>,

    /// Twitter API base URL [default: https://api.twitter.com]
    #[arg(long, env = "TWITTER_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Serve Prometheus metrics on this address
    #[arg(long, env = "METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

/// TOML file layout. Every section and key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub kafka: KafkaSection,
    pub credentials: Vec<CredentialEntry>,
    pub search: SearchSection,
    pub limits: LimitsSection,
    pub retry: RetrySection,
    pub output: OutputSection,
    pub api: ApiSection,
    pub metrics: MetricsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KafkaSection {
    pub brokers: Option<String>,
    pub topic: Option<String>,
    pub message_timeout_ms: Option<u64>,
}

/// One `[[credentials]]` entry
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialEntry {
    pub id: String,
    pub secret: Secret<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchSection {
    pub query: Option<String>,
    pub lang: Option<String>,
    pub geocode: Option<String>,
    pub count: Option<u32>,
    pub tweet_mode: Option<TweetMode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsSection {
    pub limit: Option<u64>,
    pub max_id: Option<u64>,
    pub since_id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    pub max_retries: Option<u32>,
    pub backoff_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub json_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsSection {
    pub listen_addr: Option<SocketAddr>,
}

impl FileConfig {
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

/// Kafka producer settings
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub topic: String,
    pub message_timeout: Duration,
}

/// Twitter API client settings
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

/// Validated relay configuration
#[derive(Debug)]
pub struct Config {
    pub kafka: KafkaConfig,
    pub credentials: Vec<ClientCredentials>,
    pub query: QuerySpec,
    pub limits: Limits,
    pub retry: RetryPolicy,
    pub output_json: Option<PathBuf>,
    pub api: ApiConfig,
    pub metrics_addr: Option<SocketAddr>,
}

impl Config {
    /// Read the config file named on the command line (if any) and merge it
    /// under the command line values.
    pub fn load(cli: &Cli) -> common::Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(cli, file)
    }

    /// Merge CLI/env values over file values, apply defaults, and validate.
    pub fn resolve(cli: &Cli, file: FileConfig) -> common::Result<Self> {
        let brokers = non_blank(cli.kafka_brokers.clone().or(file.kafka.brokers)).ok_or_else(
            || Error::Config("Kafka brokers are required (--kafka-brokers or KAFKA_BROKERS)".into()),
        )?;
        let topic = cli
            .topic
            .clone()
            .or(file.kafka.topic)
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        if topic.trim().is_empty() {
            return Err(Error::invalid("topic", "must not be empty"));
        }
        let message_timeout_ms = file
            .kafka
            .message_timeout_ms
            .unwrap_or(DEFAULT_MESSAGE_TIMEOUT_MS);
        if message_timeout_ms == 0 {
            return Err(Error::invalid(
                "message_timeout_ms",
                "must be greater than 0",
            ));
        }

        let credentials = if cli.twitter_client_id.is_empty() && cli.twitter_client_secret.is_empty()
        {
            file.credentials
                .into_iter()
                .map(|entry| ClientCredentials::new(entry.id, entry.secret))
                .collect()
        } else {
            pair_credentials(&cli.twitter_client_id, &cli.twitter_client_secret)?
        };
        validate_credentials(&credentials)?;

        let search_terms = non_blank(cli.query.clone().or(file.search.query));
        let geocode = non_blank(cli.geocode.clone().or(file.search.geocode));
        if search_terms.is_none() && geocode.is_none() {
            return Err(Error::Config(
                "a search query or geocode is required (--query or --geocode)".into(),
            ));
        }
        if let Some(geocode) = &geocode {
            validate_geocode(geocode)?;
        }
        let page_size = cli.count.or(file.search.count).unwrap_or(DEFAULT_COUNT);
        if !(1..=DEFAULT_COUNT).contains(&page_size) {
            return Err(Error::invalid(
                "count",
                format!("must be between 1 and {DEFAULT_COUNT}, got {page_size}"),
            ));
        }

        let query = QuerySpec {
            search_terms,
            language: non_blank(cli.lang.clone().or(file.search.lang)),
            geocode,
            page_size,
            result_format: cli.tweet_mode.or(file.search.tweet_mode).unwrap_or_default(),
        };

        let limits = Limits::from_raw(
            cli.limit.or(file.limits.limit).unwrap_or(0),
            cli.max_id.or(file.limits.max_id).unwrap_or(0),
            cli.since_id.or(file.limits.since_id).unwrap_or(0),
        );

        let max_retries = file.retry.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
        if max_retries == 0 {
            return Err(Error::invalid("max_retries", "must be greater than 0"));
        }
        let retry = RetryPolicy {
            max_retries,
            backoff: file
                .retry
                .backoff_secs
                .map_or(DEFAULT_BACKOFF, Duration::from_secs),
        };

        let base_url = cli
            .api_base_url
            .clone()
            .or(file.api.base_url)
            .unwrap_or_else(|| twitter_auth::DEFAULT_BASE_URL.to_string());
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::invalid(
                "base_url",
                format!("must start with http:// or https://, got: {base_url}"),
            ));
        }
        let timeout_secs = file.api.timeout_secs.unwrap_or(DEFAULT_API_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::invalid("timeout_secs", "must be greater than 0"));
        }

        Ok(Self {
            kafka: KafkaConfig {
                brokers,
                topic,
                message_timeout: Duration::from_millis(message_timeout_ms),
            },
            credentials,
            query,
            limits,
            retry,
            output_json: cli.output_json.clone().or(file.output.json_path),
            api: ApiConfig {
                base_url,
                timeout: Duration::from_secs(timeout_secs),
            },
            metrics_addr: cli.metrics_addr.or(file.metrics.listen_addr),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Zip CLI ids and secrets by position.
fn pair_credentials(ids: &[String], secrets: &[String]) -> common::Result<Vec<ClientCredentials>> {
    if ids.len() != secrets.len() {
        return Err(Error::invalid(
            "twitter_client_secret",
            format!(
                "{} client id(s) but {} client secret(s)",
                ids.len(),
                secrets.len()
            ),
        ));
    }
    Ok(ids
        .iter()
        .zip(secrets)
        .map(|(id, secret)| ClientCredentials::new(id.trim(), secret.trim()))
        .collect())
}

fn validate_credentials(credentials: &[ClientCredentials]) -> common::Result<()> {
    if credentials.is_empty() {
        return Err(Error::Config(
            "at least one Twitter client id/secret pair is required".into(),
        ));
    }
    for (index, credential) in credentials.iter().enumerate() {
        if credential.id.trim().is_empty() {
            return Err(Error::invalid(
                "twitter_client_id",
                format!("entry {index} is empty"),
            ));
        }
        if credential.secret.is_empty() {
            return Err(Error::invalid(
                "twitter_client_secret",
                format!("secret for {} is empty", credential.id),
            ));
        }
    }
    Ok(())
}

/// `latitude,longitude,radius`, all three present.
fn validate_geocode(geocode: &str) -> common::Result<()> {
    let parts: Vec<&str> = geocode.split(',').map(str::trim).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(Error::invalid(
            "geocode",
            format!("expected \"latitude,longitude,radius\", got: {geocode}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that read or mutate environment variables.
    /// Clap reads the env fallbacks at parse time.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &[
        "CONFIG_PATH",
        "KAFKA_BROKERS",
        "KAFKA_TOPIC",
        "TWITTER_CLIENT_ID",
        "TWITTER_CLIENT_SECRET",
        "TWITTER_API_BASE_URL",
        "METRICS_ADDR",
    ];

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    /// SAFETY: Callers must hold ENV_MUTEX.
    unsafe fn clear_env() {
        for key in ENV_KEYS {
            unsafe { std::env::remove_var(key) };
        }
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tweet-relay").chain(args.iter().copied())).unwrap()
    }

    const MINIMAL: &[&str] = &["-b", "localhost:9092", "-k", "app", "-s", "secret", "-q", "rust"];

    fn resolve(args: &[&str]) -> common::Result<Config> {
        Config::resolve(&parse(args), FileConfig::default())
    }

    fn full_toml() -> &'static str {
        r#"
[kafka]
brokers = "kafka-1:9092,kafka-2:9092"
topic = "ingest.search"
message_timeout_ms = 10000

[[credentials]]
id = "file-app-1"
secret = "file-secret-1"

[[credentials]]
id = "file-app-2"
secret = "file-secret-2"

[search]
query = "from:rustlang"
lang = "en"
count = 50
tweet_mode = "compat"

[limits]
limit = 1000
max_id = 0
since_id = 42

[retry]
max_retries = 5
backoff_secs = 10

[output]
json_path = "/var/log/relay.jsonl"

[api]
base_url = "http://localhost:8080"
timeout_secs = 5

[metrics]
listen_addr = "127.0.0.1:9100"
"#
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("tweet-relay.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_cli_only_config_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };

        let config = resolve(MINIMAL).unwrap();
        assert_eq!(config.kafka.brokers, "localhost:9092");
        assert_eq!(config.kafka.topic, DEFAULT_TOPIC);
        assert_eq!(config.kafka.message_timeout, Duration::from_millis(5000));
        assert_eq!(config.credentials.len(), 1);
        assert_eq!(config.credentials[0].id, "app");
        assert_eq!(config.credentials[0].secret.expose(), "secret");
        assert_eq!(config.query.search_terms.as_deref(), Some("rust"));
        assert_eq!(config.query.page_size, 100);
        assert_eq!(config.query.result_format, TweetMode::Extended);
        assert_eq!(config.limits, Limits::default());
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.api.base_url, "https://api.twitter.com");
        assert!(config.output_json.is_none());
        assert!(config.metrics_addr.is_none());
    }

    #[test]
    fn test_comma_separated_credentials_pair_by_position() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };

        let config = resolve(&[
            "-b", "k:9092", "-q", "rust", "-k", "a,b", "-s", "sa,sb",
        ])
        .unwrap();
        let ids: Vec<_> = config.credentials.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(config.credentials[1].secret.expose(), "sb");
    }

    #[test]
    fn test_repeated_credential_flags() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };

        let config = resolve(&[
            "-b", "k:9092", "-q", "rust", "-k", "a", "-s", "sa", "-k", "b", "-s", "sb",
        ])
        .unwrap();
        assert_eq!(config.credentials.len(), 2);
        assert_eq!(config.credentials[0].secret.expose(), "sa");
    }

    #[test]
    fn test_credentials_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };
        unsafe { set_env("TWITTER_CLIENT_ID", "env-a,env-b") };
        unsafe { set_env("TWITTER_CLIENT_SECRET", "env-sa,env-sb") };

        let config = resolve(&["-b", "k:9092", "-q", "rust"]).unwrap();
        let ids: Vec<_> = config.credentials.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["env-a", "env-b"]);

        unsafe { clear_env() };
    }

    #[test]
    fn test_mismatched_credential_counts_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };

        let err = resolve(&["-b", "k:9092", "-q", "rust", "-k", "a,b", "-s", "sa"]).unwrap_err();
        assert!(
            err.to_string().contains("twitter_client_secret"),
            "error must name the field, got: {err}"
        );
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };

        let err = resolve(&["-b", "k:9092", "-q", "rust"]).unwrap_err();
        assert!(err.to_string().contains("client id/secret"), "got: {err}");
    }

    #[test]
    fn test_missing_brokers_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };

        let err = resolve(&["-k", "a", "-s", "sa", "-q", "rust"]).unwrap_err();
        assert!(err.to_string().contains("Kafka brokers"), "got: {err}");
    }

    #[test]
    fn test_query_or_geocode_required() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };

        let err = resolve(&["-b", "k:9092", "-k", "a", "-s", "sa"]).unwrap_err();
        assert!(err.to_string().contains("--geocode"), "got: {err}");

        let config = resolve(&[
            "-b", "k:9092", "-k", "a", "-s", "sa", "-g", "37.78,-122.39,1km",
        ])
        .unwrap();
        assert!(config.query.search_terms.is_none());
        assert_eq!(config.query.geocode.as_deref(), Some("37.78,-122.39,1km"));
    }

    #[test]
    fn test_malformed_geocode_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };

        for geocode in ["37.78,-122.39", "37.78,,1km", "1,2,3,4"] {
            let err = resolve(&["-b", "k:9092", "-k", "a", "-s", "sa", "-g", geocode]).unwrap_err();
            assert!(
                err.to_string().contains("geocode"),
                "{geocode} must be rejected, got: {err}"
            );
        }
    }

    #[test]
    fn test_count_out_of_range_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };

        for count in ["0", "101"] {
            let mut args = MINIMAL.to_vec();
            args.extend(["--count", count]);
            let err = resolve(&args).unwrap_err();
            assert!(err.to_string().contains("count"), "got: {err}");
        }

        let mut args = MINIMAL.to_vec();
        args.extend(["--count", "1"]);
        assert_eq!(resolve(&args).unwrap().query.page_size, 1);
    }

    #[test]
    fn test_zero_limits_mean_unset() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };

        let mut args = MINIMAL.to_vec();
        args.extend(["--limit", "0", "--max-id", "500", "--since-id", "0"]);
        let config = resolve(&args).unwrap();
        assert_eq!(config.limits.capture_limit, None);
        assert_eq!(config.limits.max_id_limit, Some(500));
        assert_eq!(config.limits.since_id, None);
    }

    #[test]
    fn test_unknown_tweet_mode_rejected_at_parse() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };

        let mut args = vec!["tweet-relay"];
        args.extend(MINIMAL);
        args.extend(["--tweet-mode", "verbose"]);
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };

        let mut args = MINIMAL.to_vec();
        args.extend(["--api-base-url", "api.twitter.com"]);
        let err = resolve(&args).unwrap_err();
        assert!(
            err.to_string().contains("must start with http"),
            "error message should explain the issue, got: {err}"
        );
    }

    #[test]
    fn test_file_config_supplies_every_section() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, full_toml());

        let cli = parse(&["-c", path.to_str().unwrap()]);
        let config = Config::load(&cli).unwrap();

        assert_eq!(config.kafka.brokers, "kafka-1:9092,kafka-2:9092");
        assert_eq!(config.kafka.topic, "ingest.search");
        assert_eq!(config.kafka.message_timeout, Duration::from_secs(10));
        assert_eq!(config.credentials.len(), 2);
        assert_eq!(config.credentials[1].id, "file-app-2");
        assert_eq!(config.query.search_terms.as_deref(), Some("from:rustlang"));
        assert_eq!(config.query.language.as_deref(), Some("en"));
        assert_eq!(config.query.page_size, 50);
        assert_eq!(config.query.result_format, TweetMode::Compat);
        assert_eq!(config.limits, Limits::from_raw(1000, 0, 42));
        assert_eq!(
            config.retry,
            RetryPolicy {
                max_retries: 5,
                backoff: Duration::from_secs(10),
            }
        );
        assert_eq!(
            config.output_json,
            Some(PathBuf::from("/var/log/relay.jsonl"))
        );
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.timeout, Duration::from_secs(5));
        assert_eq!(config.metrics_addr, Some("127.0.0.1:9100".parse().unwrap()));
    }

    #[test]
    fn test_cli_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, full_toml());

        let cli = parse(&[
            "-c",
            path.to_str().unwrap(),
            "-b",
            "cli:9092",
            "-k",
            "cli-app",
            "-s",
            "cli-secret",
            "--count",
            "20",
        ]);
        let config = Config::load(&cli).unwrap();

        assert_eq!(config.kafka.brokers, "cli:9092");
        assert_eq!(config.credentials.len(), 1, "CLI credentials replace the file's");
        assert_eq!(config.credentials[0].id, "cli-app");
        assert_eq!(config.query.page_size, 20);
        // untouched values still come from the file
        assert_eq!(config.kafka.topic, "ingest.search");
    }

    #[test]
    fn test_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, full_toml());
        unsafe { set_env("CONFIG_PATH", path.to_str().unwrap()) };
        unsafe { set_env("KAFKA_TOPIC", "env-topic") };

        let config = Config::load(&parse(&[])).unwrap();
        assert_eq!(config.kafka.topic, "env-topic");
        assert_eq!(config.kafka.brokers, "kafka-1:9092,kafka-2:9092");

        unsafe { clear_env() };
    }

    #[test]
    fn test_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };
        unsafe { set_env("KAFKA_BROKERS", "env:9092") };

        let config = resolve(MINIMAL).unwrap();
        assert_eq!(
            config.kafka.brokers, "localhost:9092",
            "CLI arg must take precedence over KAFKA_BROKERS env var"
        );

        unsafe { clear_env() };
    }

    #[test]
    fn test_load_missing_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };

        let cli = parse(&["-c", "/nonexistent/path/config.toml"]);
        assert!(Config::load(&cli).is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");
        assert!(FileConfig::load(&path).is_err());
    }

    #[test]
    fn test_unknown_file_keys_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[kafka]\nbrokers = \"k:9092\"\nbroker = \"typo\"\n");
        assert!(FileConfig::load(&path).is_err());
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };

        for toml_content in [
            "[kafka]\nmessage_timeout_ms = 0\n",
            "[api]\ntimeout_secs = 0\n",
            "[retry]\nmax_retries = 0\n",
        ] {
            let file: FileConfig = toml::from_str(toml_content).unwrap();
            let result = Config::resolve(&parse(MINIMAL), file);
            assert!(result.is_err(), "{toml_content:?} must be rejected");
        }
    }

    #[test]
    fn test_secrets_redacted_in_debug_output() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };

        let config = resolve(MINIMAL).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("\"secret\""), "secret leaked: {debug}");
        assert!(debug.contains("[REDACTED]"));
    }
}
