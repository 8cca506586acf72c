use std::path::PathBuf;

use scriptsense_core::results::{CommitOutcome, TextPanel};
use scriptsense_core::{JobResult, PollSnapshot};

/// Events flowing from backend tasks to the TUI.
#[derive(Debug, Clone)]
pub enum BackendEvent {
    /// The poller published a new snapshot.
    Snapshot(PollSnapshot),
    /// The job finished; fired at most once.
    JobDone(Box<JobResult>),
    /// The job was cancelled, by the user or the backend.
    JobCancelled,
    /// The cancel request failed; polling continues.
    CancelFailed(String),
    /// A reprocess round trip finished. `panel` replaces the edited one.
    Reprocessed {
        panel: TextPanel,
        outcome: CommitOutcome,
    },
    Exported(PathBuf),
    ExportFailed(String),
}
