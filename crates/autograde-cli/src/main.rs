use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use autograde_core::{save_results, FeedbackConfig, GraderConfig, ResultsPayload};
use autograde_feedback::enhance_results_with_ai_feedback;
use autograde_harness::grade_directory;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "autograde")]
#[command(about = "Grade a convolution assignment submission", long_about = None)]
struct Cli {
    /// Autograder directory holding `submission/`, `source/` and `results/`
    autograder_dir: PathBuf,

    /// Python interpreter used to run the submission
    #[arg(long)]
    python: Option<String>,

    /// Skip the language-model feedback pass
    #[arg(long)]
    no_feedback: bool,

    /// Also convert source/solution.ipynb
    #[arg(long)]
    convert_solution: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = GraderConfig::new(&cli.autograder_dir).with_env();
    if let Some(python) = cli.python {
        config.python = python;
    }
    config.convert_solution = cli.convert_solution;

    let results_dir = config.autograder_dir.join("results");
    fs::create_dir_all(&results_dir)
        .with_context(|| format!("creating {}", results_dir.display()))?;

    let grading = config.clone();
    let results = tokio::task::spawn_blocking(move || grade_directory(&grading))
        .await
        .context("grading task failed")?
        .context("grading setup failed")?;

    let feedback = if cli.no_feedback {
        None
    } else {
        feedback_config(FeedbackConfig::from_env())
    };

    let results = match feedback {
        Some(feedback) => {
            info!("Feedback config: {:?}", feedback);
            enhance_results_with_ai_feedback(results, &config.autograder_dir, &feedback).await
        }
        None => results,
    };

    let path = save_results(&results, &config.autograder_dir)?;
    display_summary(&results);
    println!("Results written to {}", path.display());

    Ok(())
}

/// A bad feedback setting disables the feedback pass; grading results are
/// still written.
fn feedback_config(parsed: autograde_core::Result<FeedbackConfig>) -> Option<FeedbackConfig> {
    match parsed {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("AI feedback disabled: {}", e);
            None
        }
    }
}

fn display_summary(results: &ResultsPayload) {
    println!();
    println!("{:<40} {:>8} {:>8}", "Test", "Score", "Max");
    println!("{}", "-".repeat(58));
    for test in &results.tests {
        println!("{:<40} {:>8.1} {:>8.1}", test.name, test.score, test.max_score);
    }
    println!("{}", "-".repeat(58));
    println!(
        "{:<40} {:>8.1} {:>8.1}",
        "Total",
        results.total_score(),
        results.total_max_score()
    );
    println!("{}", results.output.lines().next().unwrap_or_default());
}
