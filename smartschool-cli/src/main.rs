//! `smartschool-cli` - appel des webservices Smartschool en ligne de commande
//!
//! ```text
//! smartschool-cli --config ./config.json --method getAbsents \
//!     --userIdentifier=jane.roe --schoolYear=2025
//! ```

mod args;

use anyhow::{Result, anyhow};
use args::{Args, parse_params};
use clap::Parser;
use smartschool::{Method, SmartschoolClient, SmartschoolError};
use smartschool_config::Config;
use smartschool_config::encryption::encrypt_secret;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    if let Some(secret) = &args.encrypt {
        println!("{}", encrypt_secret(secret)?);
        return Ok(ExitCode::SUCCESS);
    }

    if args.list {
        for method in Method::ALL {
            println!("{}", method);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = match &args.config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::load_config("")?,
    };
    init_logging(args.log_level.as_deref(), &config);

    let Some(name) = args.method.as_deref() else {
        return Err(anyhow!("No method given, use --method NAME (see --list)"));
    };
    let method = match name.parse::<Method>() {
        Ok(method) => method,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Available methods:");
            for method in Method::ALL {
                eprintln!("  {}", method);
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    if args.describe {
        describe(method);
        return Ok(ExitCode::SUCCESS);
    }

    let params = parse_params(&args.params)?;
    let missing: Vec<_> = method
        .required_params()
        .iter()
        .filter(|name| !params.contains_key(**name))
        .collect();
    if !missing.is_empty() {
        eprintln!("Missing required parameters for {}:", method);
        for name in missing {
            eprintln!("  --{}=...", name);
        }
        return Ok(ExitCode::FAILURE);
    }

    let client = SmartschoolClient::from_config_obj(&config)?;
    info!("Calling {} on {}", method, client.api_endpoint());
    debug!("{} parameters given", params.len());

    match client.call_method(method, params).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(SmartschoolError::Api { message, code }) => {
            eprintln!("Smartschool error {}: {}", code, message);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

/// Installe le subscriber tracing
///
/// `--log-level` l'emporte sur `RUST_LOG`, qui l'emporte sur la configuration.
fn init_logging(cli_level: Option<&str>, config: &Config) {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level.to_lowercase()),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.get_log_min_level().to_lowercase())),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn describe(method: Method) {
    println!("{}", method);
    println!(
        "  access code: {}",
        if method.needs_auth() { "required" } else { "not sent" }
    );

    println!("  required:");
    if method.required_params().is_empty() {
        println!("    (none)");
    }
    for name in method.required_params() {
        println!("    --{}", name);
    }

    if !method.optional_params().is_empty() {
        println!("  optional:");
        for name in method.optional_params() {
            println!("    --{}", name);
        }
    }
}
