use cfo_copilot::{
    agent::Copilot, config::CopilotConfig, context::DataContext, models::Period,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "copilot")]
#[command(about = "Answer finance questions from actuals, budget, fx and cash CSVs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding actuals.csv, budget.csv, fx.csv and cash.csv
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question, e.g. "What was June 2025 revenue vs budget?"
    Ask {
        question: String,

        /// Print the full answer and Vega-Lite chart as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the two-page PDF snapshot
    Export {
        output: PathBuf,

        /// Period as YYYY-MM; defaults to the latest actuals month
        #[arg(long)]
        period: Option<Period>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    dotenv::dotenv().ok();

    // logs go to stderr so --json output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("cfo_copilot={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = CopilotConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.sources = cfo_copilot::config::DataSources::in_dir(dir);
    }

    let context = DataContext::from_sources(&config.sources, &config.columns)?;
    let copilot = Copilot::default();

    match cli.command {
        Commands::Ask { question, json } => {
            let answer = copilot.answer(&context, &question);

            if json {
                let chart_spec = copilot.render_chart(&answer)?;
                let output = serde_json::json!({
                    "answer": answer,
                    "chart_spec": chart_spec,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", answer.text);
                if let Some(chart) = &answer.chart {
                    println!("\n{}", chart.title);
                    for point in &chart.points {
                        match point.value {
                            Some(value) => println!("  {:<12} {:>14.2}", point.label, value),
                            None => println!("  {:<12} {:>14}", point.label, "n/a"),
                        }
                    }
                }
            }
        }
        Commands::Export { output, period } => {
            let bytes = copilot.snapshot_pdf(&context, period)?;
            std::fs::write(&output, &bytes)?;
            info!(path = %output.display(), bytes = bytes.len(), "Snapshot written");
            println!("Wrote {}", output.display());
        }
    }

    Ok(())
}
