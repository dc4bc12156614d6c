use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use sprint_client::{
    render_run, run_deep_sprint, ClientConfig, DeepSprintRun, FixedSteps, RenderOptions,
    RunOutcome, SprintClient,
};
use sprint_run::{RunState, TabStrip};

#[derive(Debug, Parser)]
#[command(
    name = "sprint",
    about = "Streams deep-sprint research progress from a coordinator backend",
    version
)]
struct Cli {
    #[arg(
        long,
        env = "SPRINT_ENDPOINT",
        default_value = "http://127.0.0.1:5000",
        help = "Base URL of the research coordinator"
    )]
    endpoint: String,

    #[arg(
        long = "step",
        help = "Research step title, in order; repeat for each step"
    )]
    steps: Vec<String>,

    #[arg(
        long = "steps-file",
        help = "File with one research step title per line, appended after --step entries"
    )]
    steps_file: Option<PathBuf>,

    #[arg(
        long = "csrf-token",
        env = "SPRINT_CSRF_TOKEN",
        help = "Anti-forgery token forwarded as X-CSRFToken"
    )]
    csrf_token: Option<String>,

    #[arg(
        long = "connect-timeout-ms",
        default_value_t = 10_000,
        help = "Connection timeout in milliseconds; the stream itself is unbounded"
    )]
    connect_timeout_ms: u64,

    #[arg(long, default_value_t = 96, help = "Render width in characters")]
    width: usize,

    #[arg(long = "no-color", help = "Disable ANSI color output")]
    no_color: bool,

    #[arg(
        long = "out-dir",
        help = "Directory to write the rendered step and report texts into"
    )]
    out_dir: Option<PathBuf>,
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_steps(cli: &Cli) -> Result<Vec<String>> {
    let mut titles = cli.steps.clone();
    if let Some(path) = &cli.steps_file {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read steps file {}", path.display()))?;
        titles.extend(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }
    if titles.is_empty() {
        bail!("no research steps found; pass --step or --steps-file");
    }
    Ok(titles)
}

fn write_exports(run: &DeepSprintRun, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    for record in run.state.steps() {
        if let Some(text) = run.state.step_report_text(record.index) {
            let path = out_dir.join(format!("step_{}.txt", record.index));
            fs::write(&path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
    }
    if let Some(body) = run.state.final_report_text() {
        let path = out_dir.join("final_report.txt");
        fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
    }
    let combined = run.state.combined_report_text();
    if !combined.is_empty() {
        let path = out_dir.join("report.txt");
        fs::write(&path, combined)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let titles = load_steps(&cli)?;

    let client = SprintClient::new(ClientConfig {
        base_url: cli.endpoint.clone(),
        csrf_token: cli.csrf_token.clone(),
        connect_timeout_ms: cli.connect_timeout_ms,
    })?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let options = RenderOptions {
        width: cli.width,
        color: !cli.no_color,
    };
    let mut on_progress = |state: &RunState, tabs: &TabStrip| {
        for line in render_run(state, tabs, &options) {
            println!("{line}");
        }
        println!();
    };

    let source = FixedSteps::new(titles);
    let run = run_deep_sprint(&client, &source, cancel_rx, Some(&mut on_progress)).await;

    for line in render_run(&run.state, &run.tabs, &options) {
        println!("{line}");
    }
    println!(
        "frames={} parse_failures={} out_of_range={} duplicates={}",
        run.stats.frames,
        run.stats.parse_failures,
        run.stats.out_of_range,
        run.stats.duplicate_steps
    );

    match &run.outcome {
        RunOutcome::Completed => {
            if let Some(out_dir) = &cli.out_dir {
                write_exports(&run, out_dir)?;
            }
            Ok(())
        }
        RunOutcome::Cancelled => {
            eprintln!("run cancelled before completion");
            Ok(())
        }
        RunOutcome::TransportFailed(error) => {
            eprintln!("run failed: {error}");
            std::process::exit(1);
        }
    }
}
