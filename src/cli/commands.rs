use clap::{Args, Parser, Subcommand};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser)]
#[command(name = "gqlfuzz", version = VERSION, about = "Dependency-aware GraphQL API fuzzer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Traverse the dependency graph and fuzz every reachable operation
    Fuzz(FuzzArgs),
    /// Run a single query or mutation
    Single(SingleArgs),
    /// Replay a previous run's objects under different credentials
    Idor(TargetArgs),
    /// Inspect the dependency graph of a compiled schema
    Graph(GraphArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct TargetArgs {
    /// GraphQL endpoint URL
    #[arg(short, long)]
    pub url: String,

    /// Run directory holding the compiled schema; results are written here
    #[arg(short, long)]
    pub path: String,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Authorization header value, e.g. "Bearer <token>"
    #[arg(long)]
    pub auth: Option<String>,

    /// Proxy URL for all requests
    #[arg(long)]
    pub proxy: Option<String>,
}

#[derive(Args, Clone)]
pub struct FuzzArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Run every node once, ignoring dependency order
    #[arg(long)]
    pub no_dfs: bool,

    /// Override the wall-clock budget in seconds
    #[arg(long)]
    pub max_time: Option<u64>,

    /// Show a progress spinner
    #[arg(long)]
    pub progress: bool,
}

#[derive(Args, Clone)]
pub struct SingleArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Query or mutation name
    #[arg(short, long)]
    pub node: String,
}

#[derive(Args, Clone)]
pub struct GraphArgs {
    /// Run directory holding the compiled schema
    #[arg(short, long)]
    pub path: String,

    /// Write the graph as Graphviz DOT to this file
    #[arg(long)]
    pub dot: Option<String>,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
