mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;

use commands::{
    compile::CompileCommand, dump::DumpCommand, exec::ExecCommand, run::RunCommand,
};

#[derive(Parser)]
#[command(name = "flatir", version, about = "Flat IR compiler and interpreter")]
struct Cli {
    /// Config file (defaults to the nearest flatir.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and run source through a persisted, memory-mapped buffer
    Run(RunCommand),
    /// Compile a source file to a buffer
    Compile(CompileCommand),
    /// Run a persisted buffer
    Exec(ExecCommand),
    /// Disassemble a persisted buffer
    Dump(DumpCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;

    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.filter.as_str()));
    match cli.verbose {
        0 => {}
        1 => filter = filter.add_directive("debug".parse()?),
        _ => filter = filter.add_directive("trace".parse()?),
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(cmd) => cmd.run(&config)?,
        Commands::Compile(cmd) => cmd.run(&config)?,
        Commands::Exec(cmd) => cmd.run(&config)?,
        Commands::Dump(cmd) => cmd.run()?,
    }

    Ok(())
}
