use tracing_subscriber::{fmt, EnvFilter};

use crate::{config::Environment, errors::Error, Result};

/// Initialize tracing for the process.
///
/// Default: info for our crates in development, warn for everything else in production.
/// Can be overridden with `RUST_LOG`.
pub fn init(service_name: &str, environment: Environment) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(service_name, environment)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!environment.is_production())
        .try_init()
        .map_err(|e| Error::Config(format!("failed to initialize logging: {e}")))?;

    Ok(())
}

fn default_directives(service_name: &str, environment: Environment) -> String {
    let crates = [
        service_name,
        "spendbot_core",
        "spendbot_analysis",
        "spendbot_api",
        "spendbot_postgres",
        "spendbot_telegram",
    ];
    let (base, ours) = match environment {
        Environment::Production => ("warn", "info"),
        Environment::Development | Environment::Test => ("info", "debug"),
    };

    let mut directives = vec![base.to_string()];
    directives.extend(crates.iter().map(|c| format!("{}={ours}", c.replace('-', "_"))));
    directives.join(",")
}
