//! Covlane CLI
//!
//! Entry point for the `covlane` command-line tool.

use clap::{Parser, Subcommand};
use covlane::config::{PipelineConfig, RepoConfig, REPO_CONFIG_FILE};
use covlane::format::run_format;
use covlane::logging::ConsoleLog;
use covlane::pipeline::CoveragePipeline;
use covlane::toolchain;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "covlane")]
#[command(about = "Coverage report lane for gcov-instrumented builds", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the coverage report for a test target
    Report {
        /// Test target name
        target: String,

        /// Path to repo config file (default: covlane.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Project root (default: current directory)
        #[arg(long)]
        project_root: Option<PathBuf>,

        /// Build output root (default: <project-root>/build)
        #[arg(long)]
        build_root: Option<PathBuf>,

        /// Output the run summary in JSON format
        #[arg(long)]
        json: bool,

        /// Verbose output
        #[arg(long, short = 'v')]
        verbose: bool,
    },

    /// Show the discovered coverage toolchain
    Tools {
        /// Path to repo config file (default: covlane.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Run the formatting task over the configured files
    Fmt {
        /// Path to repo config file (default: covlane.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Verbose output
        #[arg(long, short = 'v')]
        verbose: bool,

        /// Extra arguments appended to the formatter invocation (after --)
        #[arg(last = true)]
        args: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            target,
            config,
            project_root,
            build_root,
            json,
            verbose,
        } => {
            run_report(&target, config, project_root, build_root, json, verbose);
        }
        Commands::Tools { config, json } => {
            run_tools(config, json);
        }
        Commands::Fmt {
            config,
            verbose,
            args,
        } => {
            run_fmt(config, verbose, &args);
        }
    }
}

fn load_repo_config(path: Option<PathBuf>) -> RepoConfig {
    let path = path.unwrap_or_else(|| PathBuf::from(REPO_CONFIG_FILE));

    if !path.exists() {
        return RepoConfig::default();
    }

    match RepoConfig::from_file(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    }
}

fn run_report(
    target: &str,
    config_path: Option<PathBuf>,
    project_root: Option<PathBuf>,
    build_root: Option<PathBuf>,
    json: bool,
    verbose: bool,
) {
    let repo = load_repo_config(config_path);

    let project_root = project_root
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let build_root = build_root.unwrap_or_else(|| project_root.join("build"));

    let config = match PipelineConfig::resolve(&repo, target, project_root, build_root) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    let log = ConsoleLog::new(verbose);
    let pipeline = CoveragePipeline::new(config);

    match pipeline.run_target(target, &log) {
        Ok(summary) => {
            if json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        eprintln!("Error serializing output: {}", e);
                        process::exit(1);
                    }
                }
            }
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}", e);
            process::exit(e.exit_code());
        }
    }
}

fn run_tools(config_path: Option<PathBuf>, json: bool) {
    let repo = load_repo_config(config_path);

    match toolchain::probe(&repo.tools) {
        Ok(toolchain) => {
            if json {
                match serde_json::to_string_pretty(&toolchain) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        eprintln!("Error serializing output: {}", e);
                        process::exit(1);
                    }
                }
            } else {
                println!("gcov:        {}", toolchain.gcov.display());
                println!("gcovr:       {}", toolchain.gcovr.display());
                println!("interpreter: {}", toolchain.interpreter.display());
                println!("gcovr version: {}", toolchain.gcovr_version);
            }
            process::exit(0);
        }
        Err(e) => {
            eprintln!("Toolchain error: {}", e);
            process::exit(2);
        }
    }
}

fn run_fmt(config_path: Option<PathBuf>, verbose: bool, extra_args: &[String]) {
    let repo = load_repo_config(config_path);
    let project_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let log = ConsoleLog::new(verbose);

    match run_format(&repo, &project_root, extra_args, &log) {
        Ok(count) => {
            log.debug(&format!("formatted {} file(s)", count));
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}
