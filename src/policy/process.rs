//! Blocking child-process execution with an optional deadline

use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of a finished child process
#[derive(Debug)]
pub(crate) struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// First non-empty stderr line, for diagnostics
    pub fn stderr_summary(&self) -> Option<String> {
        String::from_utf8_lossy(&self.stderr)
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug)]
pub(crate) enum ProcessError {
    Spawn(io::Error),
    Wait(io::Error),
    TimedOut(Duration),
}

/// Run a command to completion, killing it if it outlives `timeout`.
///
/// Output pipes are drained on helper threads so a chatty child cannot block
/// on a full pipe while we wait for it.
pub(crate) fn run(command: &mut Command, timeout: Option<Duration>) -> Result<ProcessOutput, ProcessError> {
    command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = command.spawn().map_err(ProcessError::Spawn)?;
    let stdout_reader = drain(child.stdout.take());
    let stderr_reader = drain(child.stderr.take());

    let status = match timeout {
        None => child.wait().map_err(ProcessError::Wait)?,
        Some(limit) => {
            let deadline = Instant::now() + limit;
            loop {
                match child.try_wait().map_err(ProcessError::Wait)? {
                    Some(status) => break status,
                    None if Instant::now() >= deadline => {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(ProcessError::TimedOut(limit));
                    }
                    None => thread::sleep(POLL_INTERVAL),
                }
            }
        }
    };

    Ok(ProcessOutput {
        status,
        stdout: stdout_reader.join().unwrap_or_default(),
        stderr: stderr_reader.join().unwrap_or_default(),
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer);
        }
        buffer
    })
}
