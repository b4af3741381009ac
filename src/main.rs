use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use tokio_util::sync::CancellationToken;

use industry_report::config::Config;
use industry_report::instrumentation::{Outcome, RunLog};
use industry_report::pipeline::Pipeline;

#[derive(Parser)]
#[command(
    name = "industry-report",
    about = "Generate a short, cited industry report from Wikipedia"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print the stage history and run summary
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a report for one industry
    Report {
        /// The industry to research, e.g. "semiconductor industry"
        topic: String,
    },
    /// Generate reports for every topic in a JSONL file
    Batch {
        /// Path to JSONL file with {"topic": "..."} lines
        path: String,
    },
}

#[derive(serde::Deserialize)]
struct BatchTopic {
    topic: String,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_run(run_log: &RunLog, verbose: bool) {
    if !run_log.sources.is_empty() {
        println!("\nTop {} relevant Wikipedia pages:", run_log.sources.len());
        for url in &run_log.sources {
            println!("  {}", url);
        }
    }

    match &run_log.outcome {
        Outcome::Report {
            text,
            word_count,
            word_limit,
            ..
        } => {
            println!("\n{}\n", text);
            println!("Word count: {} (must be under {})", word_count, word_limit);
            if word_count > word_limit {
                eprintln!("warning: the report is still over the word limit");
            }
        }
        Outcome::NoResults { message } => eprintln!("warning: {}", message),
        Outcome::ReportDisabled { message } => eprintln!("\n{}", message),
        Outcome::Failed { kind, message } => {
            eprintln!("\nReport generation failed.");
            eprintln!("  {}", kind);
            eprintln!("  {}", message);
        }
    }

    if verbose {
        let stages: Vec<String> = run_log.stages.iter().map(|s| s.to_string()).collect();
        eprintln!("\n[stages] {}", stages.join(" -> "));
        eprintln!("{}", run_log.summary());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = Config::from_env()?;
    let pipeline = Pipeline::new(&config)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    match cli.command {
        Commands::Report { topic } => {
            let run_log = pipeline.run(&topic, &cancel).await?;
            print_run(&run_log, cli.verbose);
            if let Outcome::Failed { kind, .. } = &run_log.outcome {
                anyhow::bail!("pipeline halted with {}", kind);
            }
        }
        Commands::Batch { path } => {
            let file =
                std::fs::File::open(&path).context(format!("Failed to open batch file: {}", path))?;
            let reader = std::io::BufReader::new(file);

            let mut run_logs: Vec<RunLog> = Vec::new();
            let mut errors = 0;

            for (i, line) in reader.lines().enumerate() {
                let line = line.context("Failed to read line")?;
                if line.trim().is_empty() {
                    continue;
                }
                if cancel.is_cancelled() {
                    break;
                }

                let entry: BatchTopic =
                    serde_json::from_str(&line).context(format!("Failed to parse line {}", i + 1))?;

                eprintln!("\n[{}/...] {}", i + 1, entry.topic);

                match pipeline.run(&entry.topic, &cancel).await {
                    Ok(run_log) => {
                        println!("  {}", run_log.summary());
                        run_logs.push(run_log);
                    }
                    Err(e) => {
                        eprintln!("  ERROR: {}", e);
                        errors += 1;
                    }
                }
            }

            if !run_logs.is_empty() {
                let reports: Vec<usize> = run_logs
                    .iter()
                    .filter_map(|r| match r.outcome {
                        Outcome::Report { word_count, .. } => Some(word_count),
                        _ => None,
                    })
                    .collect();
                let no_results = run_logs
                    .iter()
                    .filter(|r| matches!(r.outcome, Outcome::NoResults { .. }))
                    .count();
                let failed = run_logs
                    .iter()
                    .filter(|r| matches!(r.outcome, Outcome::Failed { .. }))
                    .count();
                let avg_latency = run_logs.iter().map(|r| r.total_latency_ms).sum::<u64>() as f64
                    / run_logs.len() as f64;
                let total_tokens: u32 = run_logs.iter().map(|r| r.total_tokens()).sum();

                println!("\n=== Batch Summary ===");
                println!("Topics: {} (errors: {})", run_logs.len(), errors);
                println!(
                    "Reports: {} | No results: {} | Failed: {}",
                    reports.len(),
                    no_results,
                    failed
                );
                if !reports.is_empty() {
                    let avg_words = reports.iter().sum::<usize>() as f64 / reports.len() as f64;
                    println!("Avg words: {:.0}", avg_words);
                }
                println!("Avg latency: {:.1}s", avg_latency / 1000.0);
                println!("Total tokens: {}", total_tokens);
            }
        }
    }

    Ok(())
}
