//! Blocking execution of the SPH executable with incremental output capture.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::{debug, error, info};

use crate::batch::BatchFiles;
use crate::config::{Launcher, SphConfig};
use crate::error::{Error, Result};

/// Sink for messages and progress of a running process.
pub trait Feedback: Sync {
    fn push_info(&self, message: &str);
    fn push_console(&self, line: &str);
    fn report_error(&self, message: &str);
    fn set_progress(&self, percent: u8);
    fn is_canceled(&self) -> bool {
        false
    }
}

/// Feedback that writes everything to `tracing`.
#[derive(Debug, Default)]
pub struct TracingFeedback {
    canceled: AtomicBool,
}

impl TracingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }
}

impl Feedback for TracingFeedback {
    fn push_info(&self, message: &str) {
        info!("{}", message);
    }

    fn push_console(&self, line: &str) {
        info!(target: "sph", "{}", line);
    }

    fn report_error(&self, message: &str) {
        error!(target: "sph", "{}", message);
    }

    fn set_progress(&self, percent: u8) {
        debug!(target: "sph", "progress {}%", percent);
    }

    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

/// Collects output bytes and hands out the text up to the last line break.
///
/// Bytes are decoded only once a line is complete, so a multibyte character
/// split across two reads survives.
#[derive(Debug, Default)]
pub struct LineAccumulator {
    buffer: Vec<u8>,
}

impl LineAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes`; returns the buffered text up to the last `\n` or
    /// `\r` (trailing line breaks removed). The rest stays buffered.
    pub fn feed(&mut self, bytes: &[u8]) -> Option<String> {
        self.buffer.extend_from_slice(bytes);
        self.take_complete()
    }

    fn take_complete(&mut self) -> Option<String> {
        let end = self
            .buffer
            .iter()
            .rposition(|b| matches!(b, b'\n' | b'\r'))?;
        let complete: Vec<u8> = self.buffer.drain(..=end).collect();
        Some(String::from_utf8_lossy(&complete).trim_end().to_string())
    }

    /// Progress of an unterminated `NN %` tail, consuming it.
    pub fn take_progress(&mut self) -> Option<u8> {
        if !self.buffer.contains(&b'%') {
            return None;
        }
        let progress = parse_progress(&String::from_utf8_lossy(&self.buffer))?;
        self.buffer.clear();
        Some(progress)
    }

    /// Remaining text when the stream ends without a final line break.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            let rest = std::mem::take(&mut self.buffer);
            Some(String::from_utf8_lossy(&rest).trim_end().to_string())
        }
    }
}

/// First integer of a chunk containing `%`, clamped to 100.
pub fn parse_progress(chunk: &str) -> Option<u8> {
    if !chunk.contains('%') {
        return None;
    }
    let digits: String = chunk
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().ok().map(|p| p.min(100) as u8)
}

fn pump_stdout<R: Read>(mut reader: R, feedback: &dyn Feedback) {
    let mut accumulator = LineAccumulator::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                error!("Failed to read process stdout: {}", e);
                break;
            }
        };
        if let Some(text) = accumulator.feed(&buf[..n]) {
            route_stdout(&text, feedback);
        }
        // 改行なしの進捗はすぐに反映する
        if let Some(progress) = accumulator.take_progress() {
            feedback.set_progress(progress);
        }
    }
    if let Some(text) = accumulator.finish() {
        route_stdout(&text, feedback);
    }
}

/// `%` lines go to the progress bar, everything else to the console.
fn route_stdout(text: &str, feedback: &dyn Feedback) {
    for line in text.split(&['\n', '\r'][..]) {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        match parse_progress(line) {
            Some(progress) => feedback.set_progress(progress),
            None => feedback.push_console(line),
        }
    }
}

fn pump_stderr<R: Read>(mut reader: R, feedback: &dyn Feedback) {
    let mut accumulator = LineAccumulator::new();
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if let Some(line) = accumulator.feed(&buf[..n]) {
                    feedback.report_error(&line);
                }
            }
            Err(e) => {
                error!("Failed to read process stderr: {}", e);
                break;
            }
        }
    }
    if let Some(line) = accumulator.finish() {
        feedback.report_error(&line);
    }
}

/// Runs `command` to completion, forwarding its output to `feedback`.
pub fn execute(mut command: Command, feedback: &dyn Feedback) -> Result<()> {
    let program = command.get_program().to_string_lossy().into_owned();
    let fused = format!("{:?}", command);
    info!("{}", fused);
    feedback.push_info("SPH command:");
    feedback.push_info(&fused);
    feedback.push_info("SPH output:");

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| Error::FailedToStart {
            command: program,
            source,
        })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    // パイプが詰まらないよう両方を並行して読む
    let status = thread::scope(|s| {
        if let Some(stdout) = stdout {
            s.spawn(move || pump_stdout(stdout, feedback));
        }
        if let Some(stderr) = stderr {
            s.spawn(move || pump_stderr(stderr, feedback));
        }
        child.wait()
    })?;

    let canceled = feedback.is_canceled();
    if canceled && !status.success() {
        feedback.push_info("Process was canceled and did not complete.");
        return Ok(());
    }

    match status.code() {
        Some(0) => {
            feedback.push_info("Process completed successfully.");
            Ok(())
        }
        Some(code) => {
            feedback.report_error(&format!("Process returned error code {}", code));
            Err(Error::ExitCode(code))
        }
        None => Err(Error::ProcessCrashed),
    }
}

/// The command that starts the generated script.
pub fn launch_command(files: &BatchFiles, work_dir: &Path, config: &SphConfig) -> Command {
    let mut command = match config.launcher {
        Launcher::Native => Command::new("sh"),
        Launcher::Cmd => {
            let mut c = Command::new("cmd.exe");
            c.arg("/c");
            c
        }
        Launcher::Wine => {
            let mut c = Command::new("wine");
            c.args(["cmd.exe", "/c"]);
            c
        }
    };
    command.arg(&files.script).current_dir(work_dir);
    command
}
