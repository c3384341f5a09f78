use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use simos::config::Config;
use simos::console::StdioConsole;
use simos::{boot, Kernel};

#[derive(Parser)]
#[command(name = "simos", about = "A whole-machine teaching simulator: CPU, kernel, disk, and scheduler")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    loglevel: String,
}

#[derive(Subcommand)]
enum Command {
    /// Boot the machine and run interactively until the operator shuts it down.
    Run {
        /// Path to the disk image (formatted on first use).
        #[arg(long, default_value = "simos.dsk")]
        disk: PathBuf,
        /// Load and create this program at startup, at the default priority.
        #[arg(long)]
        program: Option<PathBuf>,
    },
    /// Format or verify the disk image and exit.
    Boot {
        #[arg(long, default_value = "simos.dsk")]
        disk: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.loglevel)).init();

    match cli.command {
        Command::Run { disk, program } => run(disk, program),
        Command::Boot { disk } => {
            let mut config = Config::default();
            config.disk_path = disk;
            boot::boot(&config).context("failed to boot")?;
            Ok(())
        }
    }
}

fn run(disk: PathBuf, program: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = Config::default();
    config.disk_path = disk;

    let booted = boot::boot(&config).context("failed to boot")?;
    let console = StdioConsole::new();
    let mut kernel = Kernel::new(booted, console, &config);

    if let Some(path) = program {
        kernel
            .create_process(&path)
            .with_context(|| format!("failed to create process from {}", path.display()))?;
    }

    kernel.run();
    Ok(())
}
