use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use scriptsense_core::api::{JobStatus, TextArea};
use scriptsense_core::job::{JobId, JobPhase, JobResult};
use scriptsense_core::results::TextPanel;
use scriptsense_core::upload::{self, UploadForm};
use scriptsense_core::{languages, ApiClient, JobHooks, JobPoller, PollSnapshot};
use scriptsense_export::{ExportFormat, export_to_file};

use crate::context::Context;
use crate::output::percent;

/// What to do with a finished job's result.
#[derive(Debug, Clone)]
pub struct ResultOptions {
    pub json: bool,
    pub export: Option<PathBuf>,
    pub export_area: TextArea,
}

enum Outcome {
    Done(Box<JobResult>),
    Cancelled,
}

pub async fn upload(
    ctx: &Context,
    mut form: UploadForm,
    detect: bool,
    opts: &ResultOptions,
) -> anyhow::Result<()> {
    let session = ctx.require_session().await?;
    let api = ctx.api(&session)?;

    if detect {
        let detected = form.auto_detect(&api).await?;
        let name = detected
            .name
            .clone()
            .unwrap_or_else(|| languages::display_name(&detected.code));
        match detected.confidence {
            Some(c) => ctx.out.success(format!("detected {name} ({})", percent(c))),
            None => ctx.out.success(format!("detected {name}")),
        }
    }
    // Reject incomplete forms before showing any progress.
    form.validate()?;

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:30.cyan/blue}] {pos:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message("Uploading");
    let progress = async {
        for step in upload::simulated_progress() {
            tokio::time::sleep(upload::PROGRESS_TICK).await;
            bar.set_position(u64::from(step));
        }
    };
    let (created, ()) = tokio::join!(form.submit(&api, &session.email), progress);
    bar.finish_and_clear();
    let job_id = created?;
    ctx.out.success(format!("job {} created", ctx.out.bold(&job_id)));

    follow(ctx, api, job_id, opts, form.target_lang.as_deref()).await
}

pub async fn watch(ctx: &Context, job_id: &str, opts: &ResultOptions) -> anyhow::Result<()> {
    let session = ctx.require_session().await?;
    let api = ctx.api(&session)?;
    follow(ctx, api, parse_job_id(job_id)?, opts, None).await
}

pub async fn status(ctx: &Context, job_id: &str) -> anyhow::Result<()> {
    let session = ctx.require_session().await?;
    let api = ctx.api(&session)?;
    let job_id = parse_job_id(job_id)?;
    let reply = api.poll_status(&job_id).await?;

    println!("{} {}", ctx.out.bold(&job_id), status_label(reply.status));
    if let Some(metrics) = &reply.metrics {
        println!(
            "  accuracy {}  pages {}  eta {}",
            metrics.accuracy_label(),
            metrics.pages_label(),
            metrics.eta_label()
        );
    }
    if let Some(error) = reply.error_message() {
        println!("  {}", ctx.out.red(error));
    }
    Ok(())
}

pub async fn cancel(ctx: &Context, job_id: &str) -> anyhow::Result<()> {
    let session = ctx.require_session().await?;
    let api = ctx.api(&session)?;
    let job_id = parse_job_id(job_id)?;
    let reply = api.cancel_job(&job_id).await?;
    ctx.out.success(
        reply
            .message
            .unwrap_or_else(|| format!("cancellation requested for {job_id}")),
    );
    Ok(())
}

pub async fn detect(ctx: &Context, file: &Path) -> anyhow::Result<()> {
    let session = ctx.require_session().await?;
    let api = ctx.api(&session)?;
    let mut form = UploadForm::new(Some(file.to_path_buf()));
    let detected = form.auto_detect(&api).await?;

    let name = detected
        .name
        .unwrap_or_else(|| languages::display_name(&detected.code));
    println!(
        "{} {}",
        ctx.out.bold(name),
        detection_details(&detected.code, detected.confidence)
    );
    Ok(())
}

/// `(code) confidence  speech locale` as printed after the detected language name.
fn detection_details(code: &str, confidence: Option<f64>) -> String {
    let mut line = format!("({code})");
    if let Some(c) = confidence {
        line.push(' ');
        line.push_str(&percent(c));
    }
    line.push_str("  speech ");
    line.push_str(languages::speech_locale(code));
    line
}

/// Poll until the job finishes, showing live metrics. Ctrl+C cancels the job.
async fn follow(
    ctx: &Context,
    api: ApiClient,
    job_id: JobId,
    opts: &ResultOptions,
    target_hint: Option<&str>,
) -> anyhow::Result<()> {
    let (tx, mut outcomes) = mpsc::unbounded_channel();
    let done_tx = tx.clone();
    let hooks = JobHooks::new(
        move |result| {
            let _ = done_tx.send(Outcome::Done(Box::new(result)));
        },
        move || {
            let _ = tx.send(Outcome::Cancelled);
        },
    );

    let poller = JobPoller::new(Arc::new(api), ctx.config.poll_config());
    let handle = poller.start(job_id, hooks);
    let mut snapshots = handle.subscribe();

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(progress_message(&handle.snapshot()));

    let outcome = loop {
        tokio::select! {
            Some(outcome) = outcomes.recv() => break outcome,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    spinner.finish_and_clear();
                    bail!("polling stopped unexpectedly");
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if let JobPhase::Error(message) = &snapshot.phase {
                    spinner.finish_and_clear();
                    bail!("job {} failed: {message}", snapshot.job_id);
                }
                spinner.set_message(progress_message(&snapshot));
            }
            _ = tokio::signal::ctrl_c() => {
                spinner.set_message("Cancelling...");
                if let Err(e) = handle.cancel_job().await {
                    spinner.suspend(|| ctx.out.warn(format!("cancel failed: {e}; still polling")));
                }
            }
        }
    };
    spinner.finish_and_clear();
    handle.stop().await;

    match outcome {
        Outcome::Cancelled => {
            ctx.out.warn("job cancelled");
            Ok(())
        }
        Outcome::Done(result) => show_result(ctx, &result, opts, target_hint),
    }
}

fn show_result(
    ctx: &Context,
    result: &JobResult,
    opts: &ResultOptions,
    target_hint: Option<&str>,
) -> anyhow::Result<()> {
    if opts.json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        ctx.out.job_result(result);
    }

    if let Some(path) = &opts.export {
        let format = ExportFormat::from_path(path)
            .with_context(|| format!("{} must end in .pdf or .doc", path.display()))?;
        let panel = match opts.export_area {
            TextArea::Extracted => TextPanel::extracted(result),
            TextArea::Translated => TextPanel::translated(result, target_hint.unwrap_or("en")),
        };
        export_to_file(path, panel.displayed(), &panel.lang, format, &ctx.fonts())?;
        ctx.out.success(format!("exported {} text to {}", panel.area, path.display()));
    }
    Ok(())
}

fn parse_job_id(raw: &str) -> anyhow::Result<JobId> {
    JobId::new(raw).context("job id must not be empty")
}

fn status_label(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Queued => "queued",
        JobStatus::Processing => "processing",
        JobStatus::Done => "done",
        JobStatus::Cancelled => "cancelled",
        JobStatus::Error => "error",
        JobStatus::Unknown => "unknown",
    }
}

/// Spinner text for the processing view.
pub fn progress_message(snapshot: &PollSnapshot) -> String {
    if snapshot.cancelling {
        return "Cancelling...".to_string();
    }
    let metrics = &snapshot.metrics;
    format!(
        "{} {}  accuracy {}  pages {}  eta {}",
        snapshot.phase.label(),
        snapshot.job_id,
        metrics.accuracy_label(),
        metrics.pages_label(),
        metrics.eta_label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptsense_core::job::JobMetrics;

    fn snapshot() -> PollSnapshot {
        PollSnapshot {
            job_id: JobId::new("job-1").unwrap(),
            phase: JobPhase::Processing,
            metrics: JobMetrics::default(),
            cancelling: false,
            polls: 0,
        }
    }

    #[test]
    fn progress_uses_placeholders_until_metrics_arrive() {
        let msg = progress_message(&snapshot());
        assert_eq!(
            msg,
            "Processing job-1  accuracy Loading...  pages Estimating...  eta 240s"
        );
    }

    #[test]
    fn progress_shows_reported_metrics() {
        let mut snap = snapshot();
        snap.metrics.accuracy = Some("91%".to_string());
        snap.metrics.pages = Some("2".to_string());
        let msg = progress_message(&snap);
        assert!(msg.contains("accuracy 91%"));
        assert!(msg.contains("pages 2"));
        assert!(msg.contains("eta 240s"));
    }

    #[test]
    fn cancelling_overrides_metrics() {
        let mut snap = snapshot();
        snap.cancelling = true;
        assert_eq!(progress_message(&snap), "Cancelling...");
    }

    #[test]
    fn detection_details_include_speech_locale() {
        assert_eq!(detection_details("ta", Some(0.93)), "(ta) 93.0%  speech ta-IN");
        assert_eq!(detection_details("fr", None), "(fr)  speech en-US");
    }

    #[test]
    fn blank_job_id_is_rejected() {
        assert!(parse_job_id("").is_err());
        assert_eq!(parse_job_id("abc").unwrap().as_str(), "abc");
    }
}
