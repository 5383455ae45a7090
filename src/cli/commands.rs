use clap::{Args, Parser, Subcommand};

/// Version string shown by `--version`, carrying the commit and build time
/// embedded by the build script.
fn version_string() -> &'static str {
    Box::leak(
        format!(
            "{} ({} {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_HASH"),
            env!("BUILD_TIMESTAMP")
        )
        .into_boxed_str(),
    )
}

#[derive(Parser)]
#[command(name = "mcp-testbench", version = version_string(), about = "Docker-isolated security testing for MCP servers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the security test battery against a target
    Run(RunArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct RunArgs {
    /// Target MCP server URL (e.g. http://localhost:8000); omit when using
    /// --stdio or --docker-path
    pub target: Option<String>,

    /// Run against a stdio MCP server (e.g. "npx time-mcp")
    #[arg(long, conflicts_with = "target")]
    pub stdio: Option<String>,

    /// Launch the MCP server directory inside the sandbox container
    #[arg(long, conflicts_with_all = ["target", "stdio"])]
    pub docker_path: Option<String>,

    /// Run the sandbox with networking fully disabled
    #[arg(long, requires = "docker_path")]
    pub isolated: bool,

    /// Rebuild the sandbox runner image before launching
    #[arg(long, requires = "docker_path")]
    pub rebuild: bool,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output directory for reports [default: ./mcp_testbench_report]
    #[arg(short, long)]
    pub output: Option<String>,

    /// Per-probe timeout in milliseconds
    #[arg(long)]
    pub probe_timeout_ms: Option<u64>,

    /// Overall run deadline in seconds
    #[arg(long)]
    pub run_deadline_secs: Option<u64>,

    /// Maximum number of suites in flight at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Fail the run when the grade is worse than this threshold (A..F)
    #[arg(long)]
    pub grade_threshold: Option<String>,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
