use clap::Args;
use clap::Parser;
use clap::Subcommand;
use yz_node::config;
use yz_node::logging::init_logging;
use yz_node::logging::LogLevel;
use yz_node::simulation;
use yz_node::util::build_version;

#[derive(Parser, Debug)]
#[command(about, version, author)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, default_value_t = LogLevel::Info, value_enum, env)]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Command {
    #[command(about = "Writes a simulation config file with default values.")]
    Init(InitCommand),
    #[command(about = "Runs a simulation and prints its report as JSON.")]
    Run(RunCommand),
}

#[derive(Args, Debug)]
struct InitCommand {
    #[arg(
        long,
        default_value = config::DEFAULT_CONFIG_LOCATION,
        help = "The location of config file"
    )]
    pub location: String,
}

#[derive(Args, Debug)]
struct RunCommand {
    #[arg(
        long,
        short = 'c',
        env,
        help = "Config file location. If not provided, default values are used"
    )]
    pub config: Option<String>,

    #[arg(long, short = 'n', help = "Number of nodes, overrides the config file")]
    pub nodes: Option<usize>,

    #[arg(long, short = 'm', help = "Number of messages, overrides the config file")]
    pub messages: Option<usize>,

    #[arg(long, help = "Build chords before injecting failures")]
    pub chords: bool,

    #[arg(
        long,
        help = "Share of nodes marked unavailable, overrides the config file"
    )]
    pub fail_fraction: Option<f64>,

    #[arg(long = "fail-locality", help = "Mark a whole locality unavailable")]
    pub fail_localities: Vec<u32>,

    #[arg(long, help = "Seed of the overlay random generator")]
    pub seed: Option<u64>,

    #[arg(long, help = "Add every connection table to the report")]
    pub inspect: bool,
}

fn get_value<V>(value: Option<V>, default_value: V) -> V {
    value.unwrap_or(default_value)
}

async fn simulation_run(args: RunCommand) -> anyhow::Result<()> {
    let mut c = match args.config {
        Some(path) => config::Config::read_fs(path)?,
        None => config::Config::default(),
    };
    c.simulation.nodes = get_value(args.nodes, c.simulation.nodes);
    c.simulation.messages = get_value(args.messages, c.simulation.messages);
    c.simulation.fail_fraction = get_value(args.fail_fraction, c.simulation.fail_fraction);
    c.simulation.chords |= args.chords;
    c.simulation.fail_localities.extend(args.fail_localities);
    if args.seed.is_some() {
        c.overlay.seed = args.seed;
    }

    let report = simulation::run(&c, args.inspect).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);
    tracing::debug!("yz {}", build_version());

    match cli.command {
        Command::Init(args) => {
            let p = config::Config::default().write_fs(args.location.as_str())?;
            println!("Your config file has saved to: {}", p);
            Ok(())
        }
        Command::Run(args) => simulation_run(args).await,
    }
}
