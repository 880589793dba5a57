use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for the particle swarm")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, determinism
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Run the kernel frame benchmark
    Bench,
    /// Replay a seeded run twice and across both stage variants
    Verify {
        /// Number of agents
        #[arg(short = 'n', long, default_value = "2048")]
        agents: usize,
        /// Number of frames
        #[arg(short, long, default_value = "60")]
        frames: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            cargo("fmt", &["fmt", "--all", "--", "--check"])?;
            cargo(
                "clippy",
                &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
            )?;
            cargo("test", &["test", "--workspace"])?;
            verify(1024, 30)?;
        }
        Commands::Fmt => cargo("fmt", &["fmt", "--all", "--", "--check"])?,
        Commands::Clippy => cargo(
            "clippy",
            &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        )?,
        Commands::Test => cargo("test", &["test", "--workspace"])?,
        Commands::Bench => cargo(
            "bench",
            &["bench", "-p", "pps-kernel", "--bench", "bench_frame"],
        )?,
        Commands::Verify { agents, frames } => verify(agents, frames)?,
    }

    Ok(())
}

fn verify(agents: usize, frames: u64) -> Result<()> {
    let agents = agents.to_string();
    let frames = frames.to_string();
    cargo(
        "verify",
        &[
            "run", "--release", "-p", "pps-cli", "--", "verify", "--agents", &agents, "--frames",
            &frames,
        ],
    )
}

fn cargo(step: &str, args: &[&str]) -> Result<()> {
    println!("==> Running cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{step} failed");
    }
    Ok(())
}
