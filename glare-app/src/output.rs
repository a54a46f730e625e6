use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use glare_experiment::RunReport;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Behavioral event log: `<subject>_Session_<n>_Glare_Illusion_Perception_<date>.log`.
pub fn log_path(dir: &Path, subject: &str, session: u32, started: DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "{subject}_Session_{session}_Glare_Illusion_Perception_{}.log",
        started.format("%Y-%m-%d_%H-%M-%S")
    ))
}

pub fn results_path(dir: &Path, subject: &str, session: u32) -> PathBuf {
    dir.join(format!("{subject}_Session_{session}_results.json"))
}

pub fn create_log(path: &Path) -> Result<BufWriter<File>> {
    let file =
        File::create(path).with_context(|| format!("creating event log {}", path.display()))?;
    Ok(BufWriter::new(file))
}

#[derive(Serialize)]
struct ResultsFile<'a> {
    subject: &'a str,
    session: u32,
    started_at: String,
    completed: bool,
    #[serde(flatten)]
    report: &'a RunReport,
}

pub fn write_results(
    dir: &Path,
    subject: &str,
    session: u32,
    started: DateTime<Local>,
    completed: bool,
    report: &RunReport,
) -> Result<PathBuf> {
    let path = results_path(dir, subject, session);
    let file =
        File::create(&path).with_context(|| format!("creating results {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let results = ResultsFile {
        subject,
        session,
        started_at: started.to_rfc3339(),
        completed,
        report,
    };
    serde_json::to_writer_pretty(&mut writer, &results)?;
    writer.flush()?;
    Ok(path)
}
