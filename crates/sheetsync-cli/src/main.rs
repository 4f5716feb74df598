//! `sheetsync`: replay fixtures through the spreadsheet data-source layer

mod commands;
mod sheet;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use commands::{ListArgs, PivotArgs};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("sheetsync")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Spreadsheet list/pivot data sources and collaborative transforms over JSON fixtures")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Session configuration (TOML)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging unless RUST_LOG is set"),
        )
        .subcommand(
            Command::new("list")
                .about("Insert a list and print its evaluated cells")
                .arg(fixture_arg())
                .arg(model_arg())
                .arg(
                    Arg::new("columns")
                        .long("columns")
                        .required(true)
                        .value_delimiter(',')
                        .help("Comma-separated fields"),
                )
                .arg(
                    Arg::new("rows")
                        .long("rows")
                        .value_parser(value_parser!(u32))
                        .help("Number of rows, list_insert_lines by default"),
                )
                .arg(domain_arg())
                .arg(
                    Arg::new("order")
                        .long("order")
                        .help("Sort field, '-' prefix for descending"),
                ),
        )
        .subcommand(
            Command::new("pivot")
                .about("Insert a pivot and print its evaluated cells")
                .arg(fixture_arg())
                .arg(model_arg())
                .arg(
                    Arg::new("measure")
                        .long("measure")
                        .required(true)
                        .action(ArgAction::Append)
                        .help("Aggregated field, repeatable"),
                )
                .arg(Arg::new("rows").long("rows").help("Row group-by"))
                .arg(Arg::new("cols").long("cols").help("Column group-by"))
                .arg(domain_arg()),
        )
        .subcommand(
            Command::new("transform")
                .about("Transform pending commands against applied ones")
                .arg(
                    Arg::new("pending")
                        .long("pending")
                        .required(true)
                        .help("Pending command(s): JSON or path to a JSON file"),
                )
                .arg(
                    Arg::new("applied")
                        .long("applied")
                        .required(true)
                        .help("Applied command(s): JSON or path to a JSON file"),
                ),
        )
}

fn fixture_arg() -> Arg {
    Arg::new("fixture")
        .long("fixture")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("JSON fixture of the in-memory store")
}

fn model_arg() -> Arg {
    Arg::new("model").long("model").required(true).help("Target model")
}

fn domain_arg() -> Arg {
    Arg::new("domain")
        .long("domain")
        .help(r#"Domain as JSON, e.g. '[["amount", ">", 4]]'"#)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn string(args: &ArgMatches, name: &str) -> Option<String> {
    args.get_one::<String>(name).cloned()
}

fn required(args: &ArgMatches, name: &str) -> Result<String> {
    string(args, name).with_context(|| format!("missing --{name}"))
}

fn path(args: &ArgMatches, name: &str) -> Result<PathBuf> {
    args.get_one::<PathBuf>(name)
        .cloned()
        .with_context(|| format!("missing --{name}"))
}

fn strings(args: &ArgMatches, name: &str) -> Vec<String> {
    args.get_many::<String>(name)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"));
    let config = commands::load_config(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;

    let output = match matches.subcommand() {
        Some(("list", args)) => {
            let list = ListArgs {
                fixture: path(args, "fixture")?,
                model: required(args, "model")?,
                columns: strings(args, "columns"),
                rows: args.get_one::<u32>("rows").copied(),
                domain: string(args, "domain"),
                order_by: string(args, "order"),
            };
            commands::run_list(list, config).await?
        }
        Some(("pivot", args)) => {
            let pivot = PivotArgs {
                fixture: path(args, "fixture")?,
                model: required(args, "model")?,
                measures: strings(args, "measure"),
                rows: string(args, "rows"),
                cols: string(args, "cols"),
                domain: string(args, "domain"),
            };
            commands::run_pivot(pivot, config).await?
        }
        Some(("transform", args)) => commands::run_transform(&required(args, "pending")?, &required(args, "applied")?)?,
        _ => anyhow::bail!("unknown subcommand"),
    };
    print!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn columns_are_comma_separated() {
        let matches = cli()
            .try_get_matches_from([
                "sheetsync", "-v", "list", "--fixture", "f.json", "--model", "partner", "--columns", "name,owner_id",
            ])
            .unwrap();
        assert!(matches.get_flag("verbose"));
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(strings(args, "columns"), vec!["name", "owner_id"]);
    }

    #[test]
    fn transform_requires_both_sides() {
        assert!(cli().try_get_matches_from(["sheetsync", "transform", "--pending", "{}"]).is_err());
    }
}
