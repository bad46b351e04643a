use crate::exec::{ExecError, OutputStream};
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const READ_CHUNK_BYTES: usize = 8192;

/// What happened to a single spawned process. A timed-out process reports
/// `exit_code: None` — deliberately distinct from both success (`Some(0)`)
/// and explicit failure (`Some(n != 0)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepProcessOutcome {
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
}

struct StreamCollector<'a> {
    stdout: String,
    stderr: String,
    on_chunk: &'a mut dyn FnMut(OutputStream, &str),
}

impl StreamCollector<'_> {
    fn deliver(&mut self, stream: OutputStream, chunk: String) {
        match stream {
            OutputStream::Stdout => self.stdout.push_str(&chunk),
            OutputStream::Stderr => self.stderr.push_str(&chunk),
        }
        (self.on_chunk)(stream, &chunk);
    }

    fn drain(&mut self, receiver: &mpsc::Receiver<(OutputStream, String)>) {
        while let Ok((stream, chunk)) = receiver.try_recv() {
            self.deliver(stream, chunk);
        }
    }

    fn drain_to_end(&mut self, receiver: &mpsc::Receiver<(OutputStream, String)>) {
        for (stream, chunk) in receiver.iter() {
            self.deliver(stream, chunk);
        }
    }
}

/// Spawn `binary` with `arguments` in `cwd`, streaming stdout/stderr chunks
/// to `on_chunk` as they arrive, and killing the process once `timeout`
/// elapses. `command` is the plan-level tool id, used only for error labels.
pub fn run_step_process(
    command: &str,
    binary: &str,
    arguments: &[String],
    cwd: &Path,
    timeout: Duration,
    on_chunk: &mut dyn FnMut(OutputStream, &str),
) -> Result<StepProcessOutcome, ExecError> {
    let mut child = match Command::new(binary)
        .args(arguments)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ExecError::MissingBinary {
                command: command.to_string(),
                binary: binary.to_string(),
            })
        }
        Err(err) => {
            return Err(ExecError::Spawn {
                command: command.to_string(),
                source: err,
            })
        }
    };

    let stdout = child.stdout.take().ok_or_else(|| ExecError::Spawn {
        command: command.to_string(),
        source: std::io::Error::other("missing stdout pipe"),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| ExecError::Spawn {
        command: command.to_string(),
        source: std::io::Error::other("missing stderr pipe"),
    })?;

    let (sender, receiver) = mpsc::channel::<(OutputStream, String)>();
    let stdout_sender = sender.clone();
    let stdout_reader =
        thread::spawn(move || pump_stream(stdout, OutputStream::Stdout, stdout_sender));
    let stderr_reader = thread::spawn(move || pump_stream(stderr, OutputStream::Stderr, sender));

    let mut collector = StreamCollector {
        stdout: String::new(),
        stderr: String::new(),
        on_chunk,
    };

    let started = Instant::now();
    let exit_status = loop {
        collector.drain(&receiver);
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if started.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    // Killing the child closes its pipes, so the reader
                    // threads reach EOF and drop their senders.
                    collector.drain_to_end(&receiver);
                    let _ = stdout_reader.join();
                    let _ = stderr_reader.join();
                    return Ok(StepProcessOutcome {
                        exit_code: None,
                        timed_out: true,
                        stdout: collector.stdout,
                        stderr: collector.stderr,
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                return Err(ExecError::Spawn {
                    command: command.to_string(),
                    source: err,
                })
            }
        }
    };

    collector.drain_to_end(&receiver);
    let _ = stdout_reader.join();
    let _ = stderr_reader.join();

    Ok(StepProcessOutcome {
        exit_code: exit_status.code(),
        timed_out: false,
        stdout: collector.stdout,
        stderr: collector.stderr,
    })
}

fn pump_stream(
    mut source: impl Read,
    stream: OutputStream,
    sender: mpsc::Sender<(OutputStream, String)>,
) {
    let mut buffer = [0_u8; READ_CHUNK_BYTES];
    loop {
        match source.read(&mut buffer) {
            Ok(0) | Err(_) => break,
            Ok(read) => {
                let chunk = String::from_utf8_lossy(&buffer[..read]).into_owned();
                if sender.send((stream, chunk)).is_err() {
                    break;
                }
            }
        }
    }
}
