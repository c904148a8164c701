//! Command-line interface for the feed connectors.
//!
//! The CLI resolves the global and customer configuration of a connector,
//! prepares the output and state directories, and prints the resulting run
//! plan for the fetch and output stages.

use std::{
    io,
    path::{Path, PathBuf},
    process,
};

use clap::{ArgAction, Args, Parser, Subcommand};
use feed_connectors::{
    Connector, CustomerConfig, DEFAULT_CUSTOMER_CONF, DEFAULT_GLOBAL_CONF, DEFAULT_TOPOLOGY_FEED,
    Error, GlobalConfig, RunPlan, parse_tags,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command line interface resolving connector configuration.
#[derive(Debug, Parser,)]
#[command(name = "feed-connectors", version, about = "Resolve connector configuration into run plans")]
struct Cli
{
    /// Path to the global configuration file.
    #[arg(short = 'g', long = "global", value_name = "PATH", env = "CONNECTORS_GLOBAL_CONF", default_value = DEFAULT_GLOBAL_CONF, global = true)]
    global: PathBuf,

    /// Path to the customer configuration file.
    #[arg(short = 'c', long = "customer", value_name = "PATH", env = "CONNECTORS_CUSTOMER_CONF", default_value = DEFAULT_CUSTOMER_CONF, global = true)]
    customer: PathBuf,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long = "log-level", value_name = "FILTER", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand,)]
/// Supported commands exposed by the CLI.
enum Command
{
    /// Resolve both configurations and print the run plan.
    Plan(PlanArgs,),
    /// Parse a tag expression and print the selected tags.
    Tags(TagsArgs,),
}

#[derive(Debug, Args,)]
/// Arguments accepted by the `plan` subcommand.
struct PlanArgs
{
    /// Connector whose schema and job attributes apply.
    #[arg(long = "connector", value_enum)]
    connector: Connector,

    /// Feed used by jobs that do not declare one.
    #[arg(long = "default-feed", value_name = "URL")]
    default_feed: Option<String,>,

    /// Require path-valued options to exist on disk.
    #[arg(long = "check-paths", action = ArgAction::SetTrue)]
    check_paths: bool,

    /// Skip creating output and state directories.
    #[arg(long = "no-dirs", action = ArgAction::SetTrue)]
    no_dirs: bool,

    /// Output formatted JSON for easier inspection.
    #[arg(long = "pretty", action = ArgAction::SetTrue)]
    pretty: bool,
}

#[derive(Debug, Args,)]
/// Arguments accepted by the `tags` subcommand.
struct TagsArgs
{
    /// Tag expression such as `Scope: (EGI, Local), Monitored: Y`.
    #[arg(value_name = "EXPRESSION")]
    expression: String,
}

/// Entry point that reports errors and sets the appropriate exit status.
fn main()
{
    let cli = Cli::parse();
    init_tracing(&cli.log_level,);

    if let Err(failure,) = run(cli,) {
        error!("{}", failure.to_display_string());
        process::exit(1,);
    }
}

fn init_tracing(level: &str,)
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level,),);
    tracing_subscriber::fmt().with_env_filter(filter,).with_writer(io::stderr,).init();
}

/// Executes the CLI using parsed arguments.
///
/// # Errors
///
/// Propagates configuration, directory and serialization errors.
fn run(cli: Cli,) -> Result<(), Error,>
{
    match cli.command {
        Command::Plan(args,) => run_plan(&cli.global, &cli.customer, args,),
        Command::Tags(args,) => run_tags(args,),
    }
}

fn run_plan(global_path: &Path, customer_path: &Path, args: PlanArgs,) -> Result<(), Error,>
{
    let plan = resolve_plan(global_path, customer_path, &args,)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    plan.write_json(&mut handle, args.pretty,)
}

fn resolve_plan(global_path: &Path, customer_path: &Path, args: &PlanArgs,) -> Result<RunPlan, Error,>
{
    let connector = args.connector;
    let global = GlobalConfig::builder(global_path,)
        .connector(Some(connector,),)
        .check_paths(args.check_paths,)
        .parse()?;
    let customers = CustomerConfig::builder(customer_path,).connector(Some(connector,),).parse()?;

    if !args.no_dirs {
        let outputs = customers.make_dir_struct(None,)?;
        let states = match global.get("InputState", "SaveDir",) {
            Some(root,) => customers.make_dir_struct(Some(Path::new(root,),),)?,
            None => Vec::new(),
        };
        info!("Prepared {} output and {} state directories", outputs.len(), states.len());
    }

    let default_feed = args
        .default_feed
        .as_deref()
        .or_else(|| (connector == Connector::Topology).then_some(DEFAULT_TOPOLOGY_FEED,),);

    RunPlan::resolve(&global, &customers, connector, default_feed,)
}

fn run_tags(args: TagsArgs,) -> Result<(), Error,>
{
    let tags = parse_tags(&args.expression,)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer(&mut handle, &tags,)?;

    Ok((),)
}

#[cfg(test)]
mod tests
{
    use std::{fs, path::Path};

    use clap::Parser;
    use feed_connectors::{Connector, Error};
    use tempfile::tempdir;

    use super::{Cli, Command, resolve_plan, run_tags};

    const GLOBAL: &str = "
[General]
PublishAms = False
WriteAvro = True

[Connection]
Timeout = 180
Retry = 3
SleepRetry = 60

[InputState]
SaveDir = STATES
Days = 3

[AvroSchemas]
Weights = /etc/argo-egi-connectors/schemas/weight_sites.avsc

[Output]
Weights = weights_DATE.avro
";

    const CUSTOMERS: &str = "
[CUSTOMER_Tenant]
Name = Tenant
OutputDir = OUTPUT
Jobs = JOB_Tenant_Critical

[JOB_Tenant_Critical]
Dirname = Critical
Profiles = ARGO_MON_CRITICAL
WeightsFeed = https://operations-portal.example.org/vapor/downloadLavoisier/option/json/view/VAPOR_Ngi_Sites_Info
";

    #[test]
    fn cli_parses_plan_arguments()
    {
        let cli = Cli::try_parse_from([
            env!("CARGO_BIN_NAME"),
            "-g",
            "global.conf",
            "plan",
            "--connector",
            "downtimes",
            "--pretty",
        ],)
        .expect("failed to parse CLI",);

        assert_eq!(cli.global, Path::new("global.conf"));
        let args = match cli.command {
            Command::Plan(args,) => args,
            other => panic!("unexpected command variant: {other:?}"),
        };
        assert_eq!(args.connector, Connector::Downtimes);
        assert!(args.pretty);
        assert!(!args.check_paths);
    }

    #[test]
    fn cli_rejects_unknown_connector()
    {
        let result = Cli::try_parse_from([env!("CARGO_BIN_NAME"), "plan", "--connector", "metrics",],);
        assert!(result.is_err());
    }

    #[test]
    fn plan_creates_directories_and_resolves_feeds()
    {
        let temp = tempdir().expect("failed to create tempdir",);
        let states = temp.path().join("states",);
        let output = temp.path().join("output",);
        let global_path = temp.path().join("global.conf",);
        let customer_path = temp.path().join("customer.conf",);
        fs::write(&global_path, GLOBAL.replace("STATES", states.to_str().expect("utf8",),),)
            .expect("failed to write global config",);
        fs::write(&customer_path, CUSTOMERS.replace("OUTPUT", output.to_str().expect("utf8",),),)
            .expect("failed to write customer config",);

        let cli = Cli::try_parse_from([
            env!("CARGO_BIN_NAME"),
            "--global",
            global_path.to_str().expect("utf8",),
            "--customer",
            customer_path.to_str().expect("utf8",),
            "plan",
            "--connector",
            "weights",
        ],)
        .expect("failed to parse CLI",);
        let Command::Plan(args,) = cli.command else {
            panic!("expected plan command");
        };

        let plan = resolve_plan(&cli.global, &cli.customer, &args,).expect("plan resolves",);
        assert_eq!(plan.feeds.len(), 1);
        assert!(plan.feeds[0].remote);
        assert!(output.join("Critical").is_dir());
        assert!(states.join("Tenant/Critical").is_dir());
    }

    #[test]
    fn plan_reports_missing_configuration()
    {
        let temp = tempdir().expect("failed to create tempdir",);
        let cli = Cli::try_parse_from([
            env!("CARGO_BIN_NAME"),
            "-g",
            temp.path().join("absent.conf",).to_str().expect("utf8",),
            "plan",
            "--connector",
            "topology",
        ],)
        .expect("failed to parse CLI",);
        let Command::Plan(args,) = cli.command else {
            panic!("expected plan command");
        };

        let error = resolve_plan(&cli.global, &cli.customer, &args,).unwrap_err();
        assert!(matches!(error, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn tags_command_rejects_malformed_expression()
    {
        let cli = Cli::try_parse_from([env!("CARGO_BIN_NAME"), "tags", "no pairs here",],)
            .expect("failed to parse CLI",);
        let Command::Tags(args,) = cli.command else {
            panic!("expected tags command");
        };

        let error = run_tags(args,).unwrap_err();
        assert!(matches!(error, Error::TagParse { .. }));
    }
}
