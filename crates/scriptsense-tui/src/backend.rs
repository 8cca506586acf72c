use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use scriptsense_core::poller::JobCanceller;
use scriptsense_core::{ApiClient, JobHooks, JobId, JobPoller, PollHandle};
use scriptsense_export::{default_filename, export_to_file, FontLibrary};

use crate::app::Request;
use crate::tui_event::BackendEvent;

/// Start polling `job_id`, forwarding snapshots and the terminal outcome to the TUI.
///
/// The returned handle owns the poll loop; dropping it stops polling. The
/// snapshot forwarder stops when `cancel` fires or the poller goes away.
pub fn start_job(
    poller: &JobPoller<ApiClient>,
    job_id: JobId,
    tx: mpsc::UnboundedSender<BackendEvent>,
    cancel: CancellationToken,
) -> PollHandle<ApiClient> {
    let done_tx = tx.clone();
    let cancelled_tx = tx.clone();
    let hooks = JobHooks::new(
        move |result| {
            let _ = done_tx.send(BackendEvent::JobDone(Box::new(result)));
        },
        move || {
            let _ = cancelled_tx.send(BackendEvent::JobCancelled);
        },
    );

    let handle = poller.start(job_id, hooks);
    let mut snapshots = handle.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    if tx.send(BackendEvent::Snapshot(snapshot)).is_err() {
                        break;
                    }
                }
            }
        }
    });
    handle
}

/// Runs the requests the app queues, reporting back through events.
#[derive(Clone)]
pub struct Backend {
    pub api: ApiClient,
    pub canceller: JobCanceller<ApiClient>,
    pub fonts: FontLibrary,
    pub export_dir: PathBuf,
    pub tx: mpsc::UnboundedSender<BackendEvent>,
}

impl Backend {
    pub fn dispatch(&self, request: Request) {
        let tx = self.tx.clone();
        match request {
            Request::CancelJob => {
                let canceller = self.canceller.clone();
                tokio::spawn(async move {
                    if let Err(e) = canceller.cancel().await {
                        let _ = tx.send(BackendEvent::CancelFailed(e.to_string()));
                    }
                });
            }
            Request::Reprocess(mut panel) => {
                let api = self.api.clone();
                tokio::spawn(async move {
                    let outcome = panel.commit(&api).await;
                    let _ = tx.send(BackendEvent::Reprocessed { panel, outcome });
                });
            }
            Request::Export {
                text,
                lang,
                area,
                format,
            } => {
                let fonts = self.fonts.clone();
                let path = self.export_dir.join(default_filename(area, &lang, format));
                tokio::task::spawn_blocking(move || {
                    let event = match export_to_file(&path, &text, &lang, format, &fonts) {
                        Ok(()) => BackendEvent::Exported(path),
                        Err(e) => BackendEvent::ExportFailed(e.to_string()),
                    };
                    let _ = tx.send(event);
                });
            }
        }
    }
}
