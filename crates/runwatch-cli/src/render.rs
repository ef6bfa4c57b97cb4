//! Plain-text rendering of a run for the terminal.

use std::future::Future;
use std::io::{self, Write};

use runwatch_core::{Artifact, LogLine, RunStatus};
use runwatch_monitor::{RunSession, TaskRunner};
use tokio::sync::{broadcast, watch};
use tracing::warn;

/// Format a status line. Failed runs get a distinct tag.
pub fn status_line(status: &RunStatus) -> String {
    if status.is_error() {
        format!("[error]  {}", status)
    } else {
        format!("[status] {}", status)
    }
}

/// Format a log line behind its sequence number. Error lines get a `!`.
pub fn log_line(line: &LogLine) -> String {
    let mark = if line.level.is_error() { '!' } else { ' ' };
    format!("{:>5}{}{}", line.seq, mark, line)
}

pub fn artifact_line(artifact: &Artifact) -> String {
    format!(
        "[result] {} bytes ({}, {}x{})",
        artifact.len(),
        artifact.content_type,
        artifact.viewport.width,
        artifact.viewport.height
    )
}

/// Follow the runner's session until the run reaches a terminal state.
///
/// Ctrl-C cancels the run; the loop keeps going until the cancellation has
/// been published. Returns the terminal status.
pub async fn follow(
    runner: &TaskRunner,
    logs: broadcast::Receiver<LogLine>,
    status: watch::Receiver<RunStatus>,
) -> RunStatus {
    follow_until(runner, logs, status, tokio::signal::ctrl_c()).await
}

/// Like [`follow`], cancelling the run once `interrupt` resolves.
async fn follow_until<F>(
    runner: &TaskRunner,
    mut logs: broadcast::Receiver<LogLine>,
    mut status: watch::Receiver<RunStatus>,
    interrupt: F,
) -> RunStatus
where
    F: Future<Output = io::Result<()>>,
{
    let mut out = io::stdout();
    let mut last_shown: Option<RunStatus> = None;
    tokio::pin!(interrupt);
    let mut interrupted = false;

    let final_status = loop {
        tokio::select! {
            line = logs.recv() => match line {
                Ok(line) => {
                    let _ = writeln!(out, "{}", log_line(&line));
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "Display fell behind the log stream");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break status.borrow().clone();
                }
            },
            changed = status.changed() => {
                let current = status.borrow_and_update().clone();
                if changed.is_err() || current.is_terminal() {
                    break current;
                }
                if last_shown.as_ref().map(|s| s.current_step) != Some(current.current_step) {
                    let _ = writeln!(out, "{}", status_line(&current));
                    last_shown = Some(current);
                }
            }
            result = &mut interrupt, if !interrupted => {
                interrupted = true;
                match result {
                    Ok(()) => {
                        if runner.cancel() {
                            let _ = writeln!(out, "[status] Cancelling...");
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
                }
            }
        }
    };

    // Lines appended before the terminal transition may still be queued.
    while let Ok(line) = logs.try_recv() {
        let _ = writeln!(out, "{}", log_line(&line));
    }
    let _ = writeln!(out, "{}", status_line(&final_status));
    let _ = out.flush();
    final_status
}

/// Print the artifact summary of the session, if any.
pub fn print_artifact(session: &RunSession) {
    if let Some(artifact) = session.artifact() {
        println!("{}", artifact_line(&artifact));
    }
}
