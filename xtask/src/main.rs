use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "x")]
#[command(about = "Development automation for xcache")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format check, clippy, unit and scenario tests, demo script
    Ci,
    /// Format code (or only check formatting)
    Fmt {
        #[arg(long)]
        check: bool,
    },
    /// Run clippy with warnings denied
    Clippy,
    /// Run tests, optionally a single part of the controller
    Test {
        /// Restrict to one part
        #[arg(value_enum)]
        part: Option<Part>,
        /// Run doc tests only
        #[arg(long)]
        doc: bool,
    },
    /// Run the criterion benchmarks
    Bench {
        /// Only benchmarks whose name contains this string
        filter: Option<String>,
    },
    /// Run a request script through the simulator
    Demo {
        #[arg(default_value = "configs/demo_script.toml")]
        script: String,
        #[arg(long, default_value = "configs/xcache.toml")]
        config: String,
        /// Cycle limit
        #[arg(short = 'n', long)]
        cycles: Option<u64>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        #[arg(long)]
        release: bool,
    },
}

/// Test subsets, each a module path filter or a test target
#[derive(Clone, Copy, ValueEnum)]
enum Part {
    Cache,
    Bus,
    WriteBuffer,
    Xcache,
    System,
    /// End-to-end scripted scenarios under tests/
    Scenarios,
}

impl Part {
    fn args(self) -> &'static [&'static str] {
        match self {
            Part::Cache => &["--lib", "core::cache"],
            Part::Bus => &["--lib", "core::bus"],
            Part::WriteBuffer => &["--lib", "core::write_buffer"],
            Part::Xcache => &["--lib", "core::xcache"],
            Part::System => &["--lib", "core::system"],
            Part::Scenarios => &["--test", "integration_test"],
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci => run_ci(),
        Commands::Fmt { check } => run_fmt(check),
        Commands::Clippy => run_clippy(),
        Commands::Test { part, doc } => run_test(part, doc),
        Commands::Bench { filter } => {
            let mut cmd = cargo("bench");
            if let Some(filter) = filter {
                cmd.arg("--").arg(filter);
            }
            execute_command(&mut cmd)
        }
        Commands::Demo {
            script,
            config,
            cycles,
            json,
            release,
        } => run_demo(&script, &config, cycles, json, release),
    }
}

fn run_ci() -> Result<()> {
    println!("{}", "=== Running CI Pipeline ===".bold().blue());

    let start = Instant::now();

    run_task("Format Check", || run_fmt(true))?;
    run_task("Clippy", run_clippy)?;
    run_task("Unit Tests", || run_test(None, false))?;
    run_task("Demo Script", || {
        run_demo("configs/demo_script.toml", "configs/xcache.toml", None, true, false)
    })?;

    println!(
        "\n{} {}",
        "✓ CI passed in".green().bold(),
        format!("{:.2}s", start.elapsed().as_secs_f64()).bold()
    );

    Ok(())
}

fn run_fmt(check: bool) -> Result<()> {
    let mut cmd = cargo("fmt");
    cmd.arg("--all");
    if check {
        cmd.arg("--").arg("--check");
    }
    execute_command(&mut cmd)
}

fn run_clippy() -> Result<()> {
    let mut cmd = cargo("clippy");
    cmd.args(["--all-targets", "--", "-D", "warnings"]);
    execute_command(&mut cmd)
}

fn run_test(part: Option<Part>, doc: bool) -> Result<()> {
    let mut cmd = cargo("test");
    if doc {
        cmd.arg("--doc");
    } else if let Some(part) = part {
        cmd.args(part.args());
    }
    execute_command(&mut cmd)
}

fn run_demo(script: &str, config: &str, cycles: Option<u64>, json: bool, release: bool) -> Result<()> {
    for path in [script, config] {
        if !Path::new(path).exists() {
            println!("{} not found: {}", "✗".red().bold(), path.yellow());
            anyhow::bail!("{} not found", path);
        }
    }

    let mut cmd = cargo("run");
    cmd.args(["--quiet", "--bin", "xcache"]);
    if release {
        cmd.arg("--release");
    }
    cmd.arg("--").arg(script).arg("--config").arg(config);
    if let Some(cycles) = cycles {
        cmd.arg("--cycles").arg(cycles.to_string());
    }
    if json {
        cmd.arg("--json");
    }

    execute_command(&mut cmd)
}

fn cargo(subcommand: &str) -> Command {
    let mut cmd = Command::new("cargo");
    cmd.arg(subcommand);
    cmd
}

fn run_task<F>(name: &str, task: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    println!("{} {}", "→".blue(), name);

    let start = Instant::now();
    match task() {
        Ok(()) => {
            println!(
                "{} {} ({:.2}s)",
                "✓".green().bold(),
                name,
                start.elapsed().as_secs_f64()
            );
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "✗".red().bold(), name);
            Err(e)
        }
    }
}

fn execute_command(cmd: &mut Command) -> Result<()> {
    let status = cmd
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()?;

    if !status.success() {
        anyhow::bail!("Command failed with exit code: {}", status);
    }

    Ok(())
}
