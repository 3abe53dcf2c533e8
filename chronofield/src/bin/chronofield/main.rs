mod commands;
mod output;
mod theme;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    check::{CheckArgs, handle_check},
    codec::{DecodeArgs, EncodeArgs, handle_decode, handle_encode},
};
use output::{GlobalOptions, OutputFormat, OutputManager};

#[derive(Parser)]
#[command(name = "chronofield")]
#[command(version)]
#[command(
    about = "Validate temporal field schemas and run values through the codec",
    long_about = r#"Temporal field codec CLI that provides:

• Validation of datetime/date/duration field declarations in a TOML schema
• Encoding of ISO-8601 values into their storage form
• Decoding of stored values back into application values

Environment:
  CHRONOFIELD_SCHEMA   default schema file for every command
  RUST_LOG             log verbosity (e.g. RUST_LOG=chronofield=debug)
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a schema file and list its fields
    Check(CheckArgs),

    /// Encode a value for one field of a schema
    Encode(EncodeArgs),

    /// Decode a stored value for one field of a schema
    Decode(DecodeArgs),
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output,
        quiet: cli.quiet,
        no_color: cli.no_color,
    });

    if let Err(err) = execute(cli.command, &output) {
        output.error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn execute(command: Commands, output: &OutputManager) -> Result<()> {
    match command {
        Commands::Check(args) => handle_check(args, output),
        Commands::Encode(args) => handle_encode(args, output),
        Commands::Decode(args) => handle_decode(args, output),
    }
}
