//! Command-line arguments of `smartschool-cli`
//!
//! Options are parsed with clap; everything after them is a list of
//! `--name=value` (or `name=value`) operation parameters.
use anyhow::{Result, anyhow};
use clap::Parser;
use serde_json::Value;
use smartschool::ParameterMap;
use std::path::PathBuf;

/// Holds the parsed CLI arguments.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Call Smartschool webservices from the command line",
    long_about = None
)]
pub struct Args {
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to a YAML or JSON configuration file (defaults to the smartschool config directory)"
    )]
    pub config_path: Option<PathBuf>,

    #[arg(short = 'm', long = "method", help = "Remote operation to call, e.g. getUserDetails")]
    pub method: Option<String>,

    #[arg(long = "list", help = "List all known operations")]
    pub list: bool,

    #[arg(long = "describe", requires = "method", help = "Show the parameters of --method")]
    pub describe: bool,

    #[arg(long = "log-level", help = "Log level (overrides RUST_LOG and the configuration)")]
    pub log_level: Option<String>,

    #[arg(
        long = "encrypt",
        value_name = "SECRET",
        help = "Print the encrypted form of an access code for the configuration file"
    )]
    pub encrypt: Option<String>,

    #[arg(
        value_name = "PARAMS",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        help = "Operation parameters as --name=value"
    )]
    pub params: Vec<String>,
}

/// Turns `--name=value` arguments into an ordered parameter map
///
/// Values are kept as strings; a repeated name keeps its last value.
pub fn parse_params(raw: &[String]) -> Result<ParameterMap> {
    let mut params = ParameterMap::new();
    for arg in raw {
        let pair = arg.trim_start_matches('-');
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid parameter '{}', expected --name=value", arg))?;
        if name.is_empty() {
            return Err(anyhow!("Invalid parameter '{}', name is empty", arg));
        }
        params.insert(name.to_string(), Value::String(value.to_string()));
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_parameters() {
        let args = Args::try_parse_from([
            "smartschool-cli",
            "--config",
            "./config.json",
            "--method",
            "getAbsents",
            "--userIdentifier=jane.roe",
            "--schoolYear=2025",
        ])
        .unwrap();

        assert_eq!(args.method.as_deref(), Some("getAbsents"));
        assert_eq!(args.config_path, Some(PathBuf::from("./config.json")));
        assert_eq!(args.params, ["--userIdentifier=jane.roe", "--schoolYear=2025"]);
    }

    #[test]
    fn test_parse_params() {
        let raw = vec![
            "--title=Hallo".to_string(),
            "body=Lorem ipsum".to_string(),
            "--query=a=b".to_string(),
        ];
        let params = parse_params(&raw).unwrap();

        assert_eq!(params.keys().collect::<Vec<_>>(), ["title", "body", "query"]);
        assert_eq!(params["body"], "Lorem ipsum");
        assert_eq!(params["query"], "a=b");
    }

    #[test]
    fn test_parse_params_rejects_bare_words() {
        assert!(parse_params(&["--userIdentifier".to_string()]).is_err());
        assert!(parse_params(&["--=x".to_string()]).is_err());
    }

    #[test]
    fn test_describe_requires_method() {
        assert!(Args::try_parse_from(["smartschool-cli", "--describe"]).is_err());
        assert!(Args::try_parse_from(["smartschool-cli", "--list"]).unwrap().list);
    }
}
