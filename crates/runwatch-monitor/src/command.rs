//! Worker backed by an external process.
//!
//! The process receives the task through environment variables and reports
//! progress on its standard streams: every line becomes a log emission, with
//! a leading `LEVEL:` or `LEVEL ` token parsed into a severity. Output is
//! decoded lossily, so bytes that are not UTF-8 never stop the forwarding.
//! With step events enabled, a stdout line of the form `STEP <n>` is a
//! structured step event instead of a log line.

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use runwatch_core::{LogLevel, Task, Viewport};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::error::WorkerError;
use crate::worker::{LogEmitter, Worker};

/// Stderr lines kept for the failure message.
const STDERR_TAIL_LINES: usize = 5;

/// Runs a program once per task and forwards its output.
pub struct CommandWorker {
    program: String,
    args: Vec<String>,
    env_vars: Vec<(String, String)>,
    working_dir: Option<PathBuf>,
    step_events: bool,
    emitter: LogEmitter,
}

impl CommandWorker {
    /// Create a worker running `program`.
    ///
    /// The path can be a bare name to use PATH lookup, or a full path.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env_vars: Vec::new(),
            working_dir: None,
            step_events: false,
            emitter: LogEmitter::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Pass the browser window size to the process.
    pub fn with_viewport(self, viewport: Viewport) -> Self {
        self.with_env("RUNWATCH_VIEWPORT_WIDTH", viewport.width.to_string())
            .with_env("RUNWATCH_VIEWPORT_HEIGHT", viewport.height.to_string())
    }

    pub fn with_headless(self, headless: bool) -> Self {
        self.with_env("RUNWATCH_HEADLESS", if headless { "1" } else { "0" })
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Report `STEP <n>` stdout lines as step events.
    ///
    /// Off by default: the sentinel is then forwarded as an ordinary log line.
    pub fn with_step_events(mut self, enabled: bool) -> Self {
        self.step_events = enabled;
        self
    }

    fn command(&self, task: &Task) -> Result<Command, WorkerError> {
        let task_json = serde_json::to_string(task)
            .map_err(|e| WorkerError::failed(format!("Failed to encode task: {}", e)))?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env("RUNWATCH_TASK", task.description())
            .env("RUNWATCH_MAX_STEPS", task.max_steps().to_string())
            .env("RUNWATCH_TASK_JSON", task_json)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        Ok(cmd)
    }

    /// Forward stdout lines. Step sentinels become step events when enabled.
    async fn pump_stdout<R: AsyncRead + Unpin>(&self, stream: R) {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            match read_line_lossy(&mut reader, &mut buf).await {
                Ok(Some(line)) => {
                    let step = if self.step_events {
                        parse_step_sentinel(&line)
                    } else {
                        None
                    };
                    if let Some(step) = step {
                        self.emitter.emit_step(step);
                    } else if !line.trim().is_empty() {
                        let (level, message) = parse_line(&line, LogLevel::Info);
                        self.emitter.emit(level, message);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Error reading worker stdout");
                    break;
                }
            }
        }
    }

    /// Forward stderr lines, keeping the last few for the failure message.
    async fn pump_stderr<R: AsyncRead + Unpin>(&self, stream: R) -> VecDeque<String> {
        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            match read_line_lossy(&mut reader, &mut buf).await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let (level, message) = parse_line(&line, LogLevel::Warn);
                    self.emitter.emit(level, message);
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(message.to_string());
                }
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Error reading worker stderr");
                    break;
                }
            }
        }
        tail
    }
}

/// Read one line, replacing invalid UTF-8 with U+FFFD.
///
/// Returns `None` at end of stream. The line terminator is stripped.
async fn read_line_lossy<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

#[async_trait]
impl Worker for CommandWorker {
    fn emitter(&self) -> &LogEmitter {
        &self.emitter
    }

    async fn run(&self, task: &Task) -> Result<(), WorkerError> {
        info!(
            program = %self.program,
            task_id = %task.id(),
            max_steps = task.max_steps(),
            "Spawning worker process"
        );

        let mut child = self.command(task)?.spawn().map_err(WorkerError::Spawn)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerError::failed("Failed to get worker stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| WorkerError::failed("Failed to get worker stderr"))?;

        let ((), tail) = tokio::join!(self.pump_stdout(stdout), self.pump_stderr(stderr));

        let status = child.wait().await?;
        let code = status.code().unwrap_or(-1);
        debug!(exit_code = code, success = status.success(), "Worker process exited");

        if !status.success() {
            let stderr_tail = if tail.is_empty() {
                "no stderr output".to_string()
            } else {
                Vec::from(tail).join(" | ")
            };
            return Err(WorkerError::ProcessExit { code, stderr_tail });
        }
        Ok(())
    }
}

/// Split a leading level token off a raw output line.
///
/// Recognises `INFO: msg`, `INFO     [agent] msg` and `INFO:root:msg`.
/// Lines without a known level keep `default` and their full text.
fn parse_line(raw: &str, default: LogLevel) -> (LogLevel, &str) {
    let trimmed = raw.trim_end();
    let end = trimmed
        .find(|c: char| c == ':' || c.is_whitespace())
        .unwrap_or(trimmed.len());
    let (head, rest) = trimmed.split_at(end);
    if head.is_empty() {
        return (default, trimmed);
    }
    match head.parse::<LogLevel>() {
        Ok(level) => (level, rest.trim_start_matches(':').trim_start()),
        Err(_) => (default, trimmed),
    }
}

fn parse_step_sentinel(line: &str) -> Option<u32> {
    line.trim().strip_prefix("STEP ")?.trim().parse().ok()
}
