use clap::{Args, Parser, Subcommand, ValueEnum};
use mws_compiler::WarningsMode;

#[derive(Debug, Parser)]
#[command(name = "mws-cli")]
#[command(about = "Compile and run game scripts against a directory of content XML")]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) global: GlobalArgs,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Args)]
pub(crate) struct GlobalArgs {
    #[arg(long = "content-dir", global = true, default_value = ".")]
    pub(crate) content_dir: String,
    #[arg(long = "warnings", global = true, value_enum, default_value_t = WarningsArg::Normal)]
    pub(crate) warnings: WarningsArg,
    #[arg(long = "seed", global = true, default_value_t = 0)]
    pub(crate) seed: u32,
    /// Print one JSON document instead of result lines.
    #[arg(long = "json", global = true)]
    pub(crate) json: bool,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Compile every script and report diagnostics.
    Compile,
    /// Print the bytecode of one script.
    Dump(DumpArgs),
    /// Advance the world a number of frames.
    Run(RunArgs),
    /// Run one console line.
    Eval(EvalArgs),
    /// List the entries of a topic whose conditions pass.
    Dialogue(DialogueArgs),
}

#[derive(Debug, Args)]
pub(crate) struct DumpArgs {
    pub(crate) script: String,
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    #[arg(long = "ticks", default_value_t = 1)]
    pub(crate) ticks: u32,
    #[arg(long = "frame-seconds", default_value_t = 0.1)]
    pub(crate) frame_seconds: f32,
    #[arg(long = "start")]
    pub(crate) start: Vec<String>,
    #[arg(long = "state-in")]
    pub(crate) state_in: Option<String>,
    #[arg(long = "state-out")]
    pub(crate) state_out: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct EvalArgs {
    pub(crate) source: String,
    #[arg(long = "target")]
    pub(crate) target: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct DialogueArgs {
    pub(crate) topic: String,
    #[arg(long = "subject")]
    pub(crate) subject: String,
    #[arg(long = "target")]
    pub(crate) target: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum WarningsArg {
    Ignore,
    Normal,
    Strict,
}

impl From<WarningsArg> for WarningsMode {
    fn from(value: WarningsArg) -> Self {
        match value {
            WarningsArg::Ignore => WarningsMode::Ignore,
            WarningsArg::Normal => WarningsMode::Normal,
            WarningsArg::Strict => WarningsMode::Strict,
        }
    }
}
