use crate::CountStrategy;
use clap::{
    Parser,
    Subcommand,
};
use std::{
    path::PathBuf,
    time::Duration,
};

/// Finds unused and rarely used processors in an Apache NiFi flow
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Additional YAML configuration file, applied on top of `<config_dir>/config.yaml`.
    #[clap(long, global = true, value_name = "FILE", env = "NIFI_USAGE_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// NiFi base URL, e.g. `https://nifi.example.com:8443`.
    #[clap(long, global = true, value_name = "URL", env = "NIFI_USAGE_URL")]
    pub url: Option<String>,

    #[clap(long, global = true, env = "NIFI_USAGE_USERNAME")]
    pub username: Option<String>,

    #[clap(long, global = true, env = "NIFI_USAGE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Process group to analyze (`root` for the whole canvas).
    #[clap(long = "group-id", value_name = "ID", env = "NIFI_USAGE_PROCESS_GROUP_ID")]
    pub group_id: Option<String>,

    /// CSV file with `id,flow_name` rows; analyzes every listed flow.
    #[clap(long = "flows-csv", value_name = "FILE", env = "NIFI_USAGE_FLOWS_CSV")]
    pub flows_csv: Option<PathBuf>,

    /// Verify the server's TLS certificate.
    #[clap(long = "verify-ssl", global = true, action, conflicts_with = "no_verify_ssl")]
    pub verify_ssl: bool,

    /// Accept self-signed or otherwise invalid certificates.
    #[clap(long = "no-verify-ssl", global = true, action)]
    pub no_verify_ssl: bool,

    /// Per-request timeout, e.g. `30s`.
    #[clap(long = "request-timeout", global = true, value_parser = humantime::parse_duration)]
    pub request_timeout: Option<Duration>,

    /// How to count executions.
    #[clap(long, value_enum, env = "NIFI_USAGE_STRATEGY")]
    pub strategy: Option<CountStrategy>,

    /// Window length in days for the provenance strategy.
    #[clap(long = "days", value_name = "DAYS", env = "NIFI_USAGE_DAYS_BACK")]
    pub days_back: Option<u32>,

    /// Result cap for each provenance search.
    #[clap(long = "max-results", env = "NIFI_USAGE_MAX_RESULTS")]
    pub max_results: Option<u32>,

    /// Delay between provenance status polls, e.g. `500ms`.
    #[clap(long = "poll-interval", value_parser = humantime::parse_duration)]
    pub poll_interval: Option<Duration>,

    /// Give up on a single processor's provenance search after this long, e.g. `2m`.
    #[clap(long = "query-timeout", value_parser = humantime::parse_duration)]
    pub query_timeout: Option<Duration>,

    /// Provenance searches running at the same time.
    #[clap(long, env = "NIFI_USAGE_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Prefix for the files written by the analysis.
    #[clap(long = "output-prefix", env = "NIFI_USAGE_OUTPUT_PREFIX")]
    pub output_prefix: Option<String>,

    /// Directory the analysis files are written to.
    #[clap(long = "output-dir", value_name = "DIR", env = "NIFI_USAGE_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Enables debug logging.
    #[clap(short, long = "verbose", global = true, action)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Analyze one process group, or every configured flow (default).
    Analyze,
    /// List the direct child process groups of a group as a flows CSV.
    ListGroups {
        /// Parent process group.
        #[clap(long = "group-id", value_name = "ID", default_value = "root")]
        group_id: String,
        /// Write the CSV here instead of standard output.
        #[clap(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    fn duration(value: &Duration) -> Value {
        humantime::format_duration(*value).to_string().into()
    }

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(url) = &self.url {
                cache.insert("nifi_url".to_string(), url.clone().into());
            }
            if let Some(username) = &self.username {
                cache.insert("username".to_string(), username.clone().into());
            }
            if let Some(password) = &self.password {
                cache.insert("password".to_string(), password.clone().into());
            }
            if let Some(group_id) = &self.group_id {
                cache.insert("process_group_id".to_string(), group_id.clone().into());
            }
            if let Some(path) = &self.flows_csv {
                cache.insert("flows_csv_path".to_string(), path.display().to_string().into());
            }
            if self.verify_ssl {
                cache.insert("verify_ssl".to_string(), true.into());
            }
            if self.no_verify_ssl {
                cache.insert("verify_ssl".to_string(), false.into());
            }
            if let Some(timeout) = &self.request_timeout {
                cache.insert("request_timeout".to_string(), duration(timeout));
            }
            if let Some(strategy) = &self.strategy {
                cache.insert("strategy".to_string(), strategy.to_string().into());
            }
            if let Some(days) = self.days_back {
                cache.insert("days_back".to_string(), u64::from(days).into());
            }
            if let Some(max_results) = self.max_results {
                cache.insert("max_results".to_string(), u64::from(max_results).into());
            }
            if let Some(interval) = &self.poll_interval {
                cache.insert("poll_interval".to_string(), duration(interval));
            }
            if let Some(timeout) = &self.query_timeout {
                cache.insert("query_timeout".to_string(), duration(timeout));
            }
            if let Some(concurrency) = self.concurrency {
                cache.insert("concurrency".to_string(), (concurrency as u64).into());
            }
            if let Some(prefix) = &self.output_prefix {
                cache.insert("output_prefix".to_string(), prefix.clone().into());
            }
            if let Some(dir) = &self.output_dir {
                cache.insert("output_dir".to_string(), dir.display().to_string().into());
            }
            if self.verbose {
                cache.insert("verbose".to_string(), true.into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let config_dir_path = crate::get_config_dir().display().to_string();
    let data_dir_path = crate::get_data_dir().display().to_string();

    format!(
        "{}

Authors: {author}

Config directory: {config_dir_path}
Data directory: {data_dir_path}",
        env!("CARGO_PKG_VERSION")
    )
}
