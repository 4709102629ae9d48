//! prover-conf CLI
//!
//! Entry point for the `prover-conf` command-line tool.

use clap::{Parser, Subcommand};
use prover_conf::{
    prepare_build, resolve, split_rules, AttributeRegistry, ConfError, ErrorReport, ResolvedConfig,
    RunRecord,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prover-conf")]
#[command(about = "Resolve and validate verification run configuration", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a run configuration and print it
    Resolve {
        /// Write the provenance record to this file
        #[arg(long)]
        record: Option<PathBuf>,

        /// Output in human-readable format instead of JSON
        #[arg(long)]
        human: bool,

        /// Configuration file and/or attribute flags (after --)
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Split discovered rules into run units
    Split {
        /// Discovered rule names (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        rules: Vec<String>,

        /// Write the group's provenance record to this file
        #[arg(long)]
        record: Option<PathBuf>,

        /// Configuration file and/or attribute flags (after --)
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// List every recognized attribute
    Attributes {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,prover_conf=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = AttributeRegistry::standard();

    match cli.command {
        Commands::Resolve { record, human, args } => {
            run_resolve(&registry, &args, record.as_deref(), human);
        }
        Commands::Split {
            rules,
            record,
            args,
        } => {
            run_split(&registry, &args, &rules, record.as_deref());
        }
        Commands::Attributes { json } => {
            run_attributes(&registry, json);
        }
    }
}

fn working_dir() -> PathBuf {
    match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Cannot determine the working directory: {}", e);
            process::exit(1);
        }
    }
}

fn resolve_or_exit(registry: &AttributeRegistry, args: &[String]) -> ResolvedConfig {
    match resolve(registry, args, &working_dir()) {
        Ok(config) => config,
        Err(e) => fail(&[e.report()]),
    }
}

fn fail(reports: &[ErrorReport]) -> ! {
    match serde_json::to_string_pretty(reports) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => {
            for report in reports {
                eprintln!("{}: {}", report.kind.as_str(), report.message);
            }
        }
    }
    process::exit(1);
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn run_resolve(registry: &AttributeRegistry, args: &[String], record: Option<&Path>, human: bool) {
    let config = resolve_or_exit(registry, args);

    let plan = match prepare_build(&config, None) {
        Ok(plan) => plan,
        Err(e) => fail(&e.reports()),
    };

    if let Some(path) = record {
        let written = RunRecord::from_config(&config).and_then(|r| r.write_to_file(path));
        if let Err(e) = written {
            eprintln!("Error writing run record: {}", e);
            process::exit(1);
        }
    }

    if human {
        for (name, entry) in config.entries() {
            if let Some(value) = &entry.value {
                println!("{:<28} {:<10} {}", name, format!("{:?}", entry.origin), value);
            }
        }
        println!();
        println!("Input mode: {:?}", plan.input_mode);
        for (file, compiler) in &plan.compilers {
            println!("  {} -> {}", file, compiler);
        }
    } else {
        print_json(&serde_json::json!({
            "config": config.values(),
            "plan": plan,
        }));
    }
}

fn run_split(
    registry: &AttributeRegistry,
    args: &[String],
    rules: &[String],
    record: Option<&Path>,
) {
    let config = resolve_or_exit(registry, args);

    let group = match split_rules(&config, rules) {
        Ok(group) => group,
        Err(e) => fail(&[ConfError::report(&e)]),
    };

    if let Some(path) = record {
        let written = group.record(&config).and_then(|r| r.write_to_file(path));
        if let Err(e) = written {
            eprintln!("Error writing run record: {}", e);
            process::exit(1);
        }
    }

    print_json(&group);
}

fn run_attributes(registry: &AttributeRegistry, json: bool) {
    if json {
        let attributes: Vec<_> = registry.iter().collect();
        print_json(&attributes);
        return;
    }

    for attr in registry.iter() {
        let flag = attr.flag().unwrap_or_else(|| format!("<{}>", attr.name));
        println!("{:<30} {:<12} {}", flag, attr.kind.describe(), attr.help);
    }
}
