mod cli;
mod headless;
mod output;
#[cfg(feature = "window")]
mod render;
#[cfg(feature = "window")]
mod window;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use cli::{Backend, Cli};
use glare_experiment::{Collaborators, DummyTracker, Experiment, Tracker};
use std::io::Write;
use tracing::{info, warn};

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "glare_experiment=info,glare_app=info,glare::events=info,glare::screen=info".into()
            }),
        )
        .init();

    info!("glare-experiment v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "subject {}, session {}, backend {:?}",
        cli.subject, cli.session, cli.backend
    );

    let config = cli.experiment_config()?;
    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating output directory {}", cli.output_dir.display()))?;

    let started = Local::now();
    let log_path = output::log_path(&cli.output_dir, &cli.subject, cli.session, started);
    let log_sink: Box<dyn Write> = Box::new(output::create_log(&log_path)?);
    info!("event log: {}", log_path.display());
    let tracker: Box<dyn Tracker> = Box::new(DummyTracker::new());

    let collab = match cli.backend {
        Backend::Headless => {
            let (collab, _clock) =
                headless::collaborators(cli.script.as_deref(), cli.frame_hz, tracker, log_sink)?;
            collab
        }
        Backend::Window => window_collaborators(&cli, tracker, log_sink)?,
    };

    let mut experiment = Experiment::new(config, collab).context("invalid configuration")?;
    let outcome = experiment.run();

    let report = match &outcome {
        Ok(report) => report,
        Err(_) => experiment.report(),
    };
    let results = output::write_results(
        &cli.output_dir,
        &cli.subject,
        cli.session,
        started,
        outcome.is_ok(),
        report,
    )?;
    info!("results: {}", results.display());

    match outcome {
        Ok(report) => {
            info!(
                "completed {} phase(s), {} block(s)",
                report.phases_run.len(),
                report.summaries.len()
            );
            Ok(())
        }
        Err(e) if e.is_abort() => {
            warn!("{e}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(feature = "window")]
fn window_collaborators(
    cli: &Cli,
    tracker: Box<dyn Tracker>,
    log_sink: Box<dyn Write>,
) -> Result<Collaborators> {
    use glare_timing::{MonotonicTimer, Timer};
    use std::sync::Arc;

    let font = match &cli.font {
        Some(path) => Some(render::TextRenderer::load(path, cli.font_size)?),
        None => {
            warn!("no --font given; on-screen text is shown in the window title only");
            None
        }
    };
    let (presenter, keys) = window::open(!cli.windowed, cli.pixels_per_cm, font)?;
    let timer: Arc<dyn Timer> = Arc::new(MonotonicTimer::new());
    Ok(Collaborators {
        timer,
        presenter: Box::new(presenter),
        keys: Box::new(keys),
        tracker,
        log_sink,
    })
}

#[cfg(not(feature = "window"))]
fn window_collaborators(
    _cli: &Cli,
    _tracker: Box<dyn Tracker>,
    _log_sink: Box<dyn Write>,
) -> Result<Collaborators> {
    anyhow::bail!("built without the `window` feature; use --backend headless")
}
