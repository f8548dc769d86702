#[macro_use]
extern crate tracing;

mod app_config;
mod args;
mod flows;

use app_config::AppConfig;
pub use app_config::{
    get_config_dir,
    get_data_dir,
};
pub use args::{
    Args,
    Command,
};
use color_eyre::Result;
use eyre::eyre;
pub use flows::{
    load_flows,
    read_flows,
    FlowEntry,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};
use strum::{
    Display,
    EnumIter,
    EnumString,
};

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

/// Upper bound accepted for `query_timeout`.
pub const MAX_QUERY_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// How execution counts are obtained.
#[derive(
    Debug, Default, Clone, Copy, Display, EnumIter, EnumString, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CountStrategy {
    /// All-time invocation counters from status snapshots.
    #[default]
    Status,
    /// Events in a recent time window from provenance searches.
    Provenance,
}

/// A password that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(<{} chars>)", self.0.chars().count())
    }
}

mod duration {
    use serde::{
        de::Error as _,
        Deserialize,
        Deserializer,
        Serializer,
    };
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(|e| D::Error::custom(format!("invalid duration {raw:?}: {e}")))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten, skip_serializing)]
    pub app_config: AppConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nifi_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<Secret>,
    pub process_group_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flows: Vec<FlowEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flows_csv_path: Option<PathBuf>,
    pub verify_ssl: bool,
    #[serde(with = "duration")]
    pub request_timeout: Duration,
    #[serde(default)]
    pub strategy: CountStrategy,
    pub days_back: u32,
    pub max_results: u32,
    #[serde(with = "duration")]
    pub poll_interval: Duration,
    #[serde(with = "duration")]
    pub query_timeout: Duration,
    pub concurrency: usize,
    pub output_prefix: String,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub verbose: bool,
}

impl Config {
    pub fn new(args: &Args) -> Result<Self, config::ConfigError> {
        Self::from_dirs(&get_config_dir(), &get_data_dir(), args)
    }

    /// Layers, lowest priority first: built-in defaults, `<config_dir>/config.yaml`, the file given
    /// with `--config`, command line and environment.
    pub fn from_dirs(config_dir: &Path, data_dir: &Path, args: &Args) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("data_dir", data_dir.display().to_string())?
            .set_default("config_dir", config_dir.display().to_string())?;

        builder = builder.add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml));

        let config_files = [("config.yaml", config::FileFormat::Yaml)];

        for (file, format) in &config_files {
            let source = config::File::from(config_dir.join(file))
                .format(*format)
                .required(false);
            builder = builder.add_source(source);
        }

        if let Some(path) = &args.config {
            builder = builder.add_source(config::File::from(path.as_path()).format(config::FileFormat::Yaml));
        }

        builder = builder.add_source(args.clone());

        let cfg: Self = builder.build()?.try_deserialize()?;

        Ok(cfg)
    }

    /// Reports every missing required setting at once.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.nifi_url.as_deref().is_none_or(|url| url.trim().is_empty()) {
            missing.push("nifi_url (--url)");
        }
        if self.username.as_deref().is_none_or(|name| name.is_empty()) {
            missing.push("username (--username)");
        }
        if self.password.as_ref().is_none_or(|password| password.expose().is_empty()) {
            missing.push("password (--password)");
        }
        if !missing.is_empty() {
            return Err(eyre!(
                "Missing required configuration: {}. Set them in {:?}, as NIFI_USAGE_* environment variables or on the command line.",
                missing.join(", "),
                self.app_config.config_dir.join("config.yaml")
            ));
        }
        if self.concurrency == 0 {
            return Err(eyre!("concurrency must be at least 1"));
        }
        if self.days_back == 0 && self.strategy == CountStrategy::Provenance {
            return Err(eyre!("days_back must be at least 1 for the provenance strategy"));
        }
        if self.max_results == 0 {
            return Err(eyre!("max_results must be at least 1"));
        }
        if self.poll_interval.is_zero() {
            return Err(eyre!("poll_interval must be greater than zero"));
        }
        if self.query_timeout.is_zero() || self.query_timeout > MAX_QUERY_TIMEOUT {
            return Err(eyre!(
                "query_timeout must be between 1s and {}",
                humantime::format_duration(MAX_QUERY_TIMEOUT)
            ));
        }
        Ok(())
    }

    /// Inline flows followed by the ones from `flows_csv_path`.
    pub fn flows(&self) -> Result<Vec<FlowEntry>> {
        let mut flows = self.flows.clone();
        if let Some(path) = &self.flows_csv_path {
            flows.extend(load_flows(path)?);
        }
        Ok(flows)
    }

    /// Batch mode analyzes a list of flows instead of a single group.
    pub fn is_batch(&self) -> bool {
        !self.flows.is_empty() || self.flows_csv_path.is_some()
    }

    pub fn config_dir(&self) -> &Path {
        &self.app_config.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.app_config.data_dir
    }
}
