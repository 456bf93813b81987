use crate::domain::report::CorrelationReport;
use anyhow::Context;
use std::path::{Path, PathBuf};
use uuid::Uuid;

fn report_path(dir: &Path, run_id: Uuid) -> PathBuf {
    dir.join(format!("{run_id}.json"))
}

fn write_report(dir: &Path, report: &CorrelationReport) -> anyhow::Result<Uuid> {
    let body = serde_json::to_vec_pretty(report).context("serialize report failed")?;
    super::write_atomic(&report_path(dir, report.run_id), &body)?;
    Ok(report.run_id)
}

pub fn persist_success(dir: &Path, report: &CorrelationReport) -> anyhow::Result<Uuid> {
    anyhow::ensure!(
        report.is_success() && report.result.is_some(),
        "only successful reports with a result can be persisted as success"
    );
    write_report(dir, report)
}

pub fn persist_failure(
    dir: &Path,
    instrument: Option<String>,
    error: &anyhow::Error,
) -> anyhow::Result<Uuid> {
    write_report(dir, &CorrelationReport::failure(instrument, error))
}

pub fn fetch_by_id(dir: &Path, run_id: Uuid) -> anyhow::Result<Option<CorrelationReport>> {
    let path = report_path(dir, run_id);
    let body = match std::fs::read(&path) {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let report = serde_json::from_slice(&body)
        .with_context(|| format!("invalid report json in {}", path.display()))?;
    Ok(Some(report))
}

/// Newest successful report by `generated_at`. Unreadable files are skipped with a
/// warning rather than failing the lookup.
pub fn fetch_latest(dir: &Path) -> anyhow::Result<Option<CorrelationReport>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("failed to list {}", dir.display())),
    };

    let mut latest: Option<CorrelationReport> = None;
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to list {}", dir.display()))?
            .path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let report: CorrelationReport = match std::fs::read(&path)
            .map_err(anyhow::Error::from)
            .and_then(|body| serde_json::from_slice(&body).map_err(anyhow::Error::from))
        {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable report");
                continue;
            }
        };

        if !report.is_success() {
            continue;
        }
        if latest
            .as_ref()
            .map_or(true, |cur| report.generated_at > cur.generated_at)
        {
            latest = Some(report);
        }
    }
    Ok(latest)
}
