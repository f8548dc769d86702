//! # NiFi Usage Analyzer
//!
//! Command line front end for `nifi-usage-gatherer`: loads the layered configuration, opens a
//! session and runs one of the modes.
//!
//! ## Usage
//!
//! ```bash
//! # All-time invocation counts for the whole canvas
//! nifi-usage-analyzer --url https://nifi.example.com:8443 --username admin --password '...'
//!
//! # Events over the last 30 days for one process group
//! nifi-usage-analyzer --strategy provenance --days 30 --group-id 8c8677c4-0191-1000-ffff-ffffa1b2c3d4
//!
//! # Write the top-level groups as a flows file, then analyze all of them
//! nifi-usage-analyzer list-groups --output flows.csv
//! nifi-usage-analyzer --flows-csv flows.csv
//! ```

#[macro_use]
extern crate tracing;

mod app;
mod logging;

pub use app::App;
pub use logging::{
    init_errors,
    init_logging,
};
pub use nifi_usage_config::{
    Args,
    Config,
};
