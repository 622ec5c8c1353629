//! External formatter pass over decoded output.
//!
//! The formatter is any shell command that reads Python on stdin and writes
//! the formatted source on stdout. It runs once, bounded by a timeout.
//! Every failure is reported to the caller, which keeps the unformatted text.

use std::fmt;
use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Command used when neither the config nor the environment names one
pub const DEFAULT_FORMATTER_CMD: &str = "black --quiet -";

/// Environment variable overriding the formatter command
pub const FORMATTER_CMD_ENV: &str = "CQ_FORMATTER_CMD";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterConfig {
    /// Shell command; `None` falls back to the environment, then the default
    pub command: Option<String>,
    pub timeout: Duration,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            command: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl FormatterConfig {
    pub fn from_env() -> Self {
        Self {
            command: std::env::var(FORMATTER_CMD_ENV).ok(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn effective_command(&self) -> String {
        self.command
            .clone()
            .or_else(|| std::env::var(FORMATTER_CMD_ENV).ok())
            .unwrap_or_else(|| DEFAULT_FORMATTER_CMD.to_string())
    }
}

/// Why the formatter output could not be used
#[derive(Debug)]
pub enum FormatterError {
    /// The shell could not be started or its pipes failed
    Io(io::Error),
    /// Non-zero exit, including 127 for a missing tool
    Failed { status: ExitStatus, stderr: String },
    TimedOut(Duration),
    /// Stdout was not UTF-8
    InvalidOutput,
}

impl fmt::Display for FormatterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatterError::Io(e) => write!(f, "formatter could not run: {}", e),
            FormatterError::Failed { status, stderr } => {
                let detail = stderr.lines().next().unwrap_or("").trim();
                if detail.is_empty() {
                    write!(f, "formatter exited with {}", status)
                } else {
                    write!(f, "formatter exited with {}: {}", status, detail)
                }
            }
            FormatterError::TimedOut(limit) => {
                write!(f, "formatter timed out after {} ms", limit.as_millis())
            }
            FormatterError::InvalidOutput => write!(f, "formatter produced non-UTF-8 output"),
        }
    }
}

impl std::error::Error for FormatterError {}

impl From<io::Error> for FormatterError {
    fn from(err: io::Error) -> Self {
        FormatterError::Io(err)
    }
}

/// Pipe `source` through the configured formatter
pub fn run_formatter(source: &str, config: &FormatterConfig) -> Result<String, FormatterError> {
    let cmd = config.effective_command();
    log::debug!("running formatter: {}", cmd);

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(&cmd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Both pipes are serviced from threads so a formatter that writes
    // before reading all its input cannot block on a full pipe.
    let stdin = child.stdin.take();
    let input = source.to_string();
    let writer = thread::spawn(move || -> io::Result<()> {
        if let Some(mut stdin) = stdin {
            stdin.write_all(input.as_bytes())?;
        }
        Ok(())
    });
    let stdout = child.stdout.take();
    let reader = thread::spawn(move || -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut stdout) = stdout {
            stdout.read_to_end(&mut buf)?;
        }
        Ok(buf)
    });
    let stderr = child.stderr.take();
    let err_reader = thread::spawn(move || -> Vec<u8> {
        let mut buf = Vec::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_end(&mut buf);
        }
        buf
    });

    let status = wait_with_deadline(&mut child, config.timeout)?;

    // A formatter may exit without draining stdin; only its exit status counts
    let _ = writer.join();
    let stderr = err_reader.join().unwrap_or_default();
    if !status.success() {
        return Err(FormatterError::Failed {
            status,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        });
    }

    let stdout = reader
        .join()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "formatter reader panicked"))??;
    String::from_utf8(stdout).map_err(|_| FormatterError::InvalidOutput)
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<ExitStatus, FormatterError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            log::debug!("formatter killed after {:?}", timeout);
            return Err(FormatterError::TimedOut(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}
