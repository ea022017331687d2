//! Command Runner: spawn a child under the workspace root with a wall-clock
//! timeout and capped dual-stream capture.

use agent_core::AgentError;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

const OUTPUT_CAP_BYTES: usize = 10 * 1024 * 1024;
const OUTPUT_RETAIN_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_TIMEOUT_MS: u64 = 5 * 60 * 1000;
const READ_CHUNK: usize = 8192;

/// Parameters shared by every command the runner spawns.
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    pub workspace_root: PathBuf,
    pub mode: String,
    pub timeout_ms: u64,
}

impl RunnerConfig {
    pub fn new(workspace_root: PathBuf, mode: impl Into<String>) -> Self {
        Self {
            workspace_root,
            mode: mode.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }
}

/// Result of running a child process to completion or timeout.
#[derive(Clone, Debug)]
pub struct CommandOutput {
    pub command: String,
    pub args: Vec<String>,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Spawn `command args` in `config.workspace_root`, capture stdout/stderr
/// concurrently, and enforce `config.timeout_ms`. Only fails on spawn
/// failure; a timed-out or non-zero-exit child is reported in the result,
/// never as an `Err`.
pub async fn run_command(
    config: &RunnerConfig,
    command: &str,
    args: &[String],
) -> Result<CommandOutput, AgentError> {
    let mut cmd = build_command(command, args);

    cmd.current_dir(&config.workspace_root)
        .env("MODE", &config.mode)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    unsafe {
        cmd.pre_exec(|| {
            libc::setsid();
            Ok(())
        });
    }

    let mut child = cmd.spawn().map_err(|e| AgentError::Io {
        path: command.to_string(),
        source: e,
    })?;

    let mut stdout_pipe = child.stdout.take().expect("stdout was piped");
    let mut stderr_pipe = child.stderr.take().expect("stderr was piped");

    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();
    let mut stdout_done = false;
    let mut stderr_done = false;
    let mut timed_out = false;

    let sleep = tokio::time::sleep(Duration::from_millis(config.timeout_ms));
    tokio::pin!(sleep);

    let mut out_chunk = [0u8; READ_CHUNK];
    let mut err_chunk = [0u8; READ_CHUNK];

    while !(stdout_done && stderr_done) {
        tokio::select! {
            n = stdout_pipe.read(&mut out_chunk), if !stdout_done => {
                match n {
                    Ok(0) | Err(_) => stdout_done = true,
                    Ok(n) => append_capped(&mut stdout_buf, &out_chunk[..n]),
                }
            }
            n = stderr_pipe.read(&mut err_chunk), if !stderr_done => {
                match n {
                    Ok(0) | Err(_) => stderr_done = true,
                    Ok(n) => append_capped(&mut stderr_buf, &err_chunk[..n]),
                }
            }
            _ = &mut sleep => {
                tracing::warn!(command, timeout_ms = config.timeout_ms, "command timed out, killing process group");
                timed_out = true;
                kill_child_process_group(&mut child);
                break;
            }
        }
    }

    let exit_code = if timed_out {
        let _ = child.wait().await;
        None
    } else {
        child.wait().await.ok().and_then(|status| status.code())
    };

    Ok(CommandOutput {
        command: command.to_string(),
        args: args.to_vec(),
        exit_code,
        timed_out,
        stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
    })
}

fn build_command(command: &str, args: &[String]) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd.args(args);
        cmd
    } else {
        let mut cmd = Command::new(command);
        cmd.args(args);
        cmd
    }
}

fn append_capped(buf: &mut Vec<u8>, chunk: &[u8]) {
    buf.extend_from_slice(chunk);
    if buf.len() > OUTPUT_CAP_BYTES {
        let excess = buf.len() - OUTPUT_RETAIN_BYTES;
        buf.drain(0..excess);
    }
}

fn kill_child_process_group(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // SAFETY: kill() is async-signal-safe; the negative pid targets
            // the process group created by setsid() in pre_exec above.
            unsafe {
                libc::kill(-(pid as i32), libc::SIGKILL);
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
    }
}

/// Return the last `max_chars` characters of `text`, for embedding a command
/// failure's output tail into a tool-result error message.
pub fn tail(text: &str, max_chars: usize) -> &str {
    if text.len() <= max_chars {
        return text;
    }
    let start = text.len() - max_chars;
    let mut boundary = start;
    while boundary < text.len() && !text.is_char_boundary(boundary) {
        boundary += 1;
    }
    &text[boundary..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_command_success() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunnerConfig::new(dir.path().to_path_buf(), "auto-apply");
        let output = run_command(&config, "echo", &["hello".to_string()])
            .await
            .unwrap();
        assert!(output.success());
        assert!(output.stdout.contains("hello"));
        assert!(!output.timed_out);
    }

    #[tokio::test]
    async fn test_run_command_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunnerConfig::new(dir.path().to_path_buf(), "auto-apply");
        let output = run_command(&config, "false", &[]).await.unwrap();
        assert!(!output.success());
        assert_eq!(output.exit_code, Some(1));
    }

    #[tokio::test]
    async fn test_run_command_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunnerConfig::new(dir.path().to_path_buf(), "auto-apply")
            .with_timeout_ms(100);
        let output = run_command(&config, "sleep", &["5".to_string()])
            .await
            .unwrap();
        assert!(output.timed_out);
        assert_eq!(output.exit_code, None);
    }

    #[tokio::test]
    async fn test_run_command_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunnerConfig::new(dir.path().to_path_buf(), "auto-apply");
        let result = run_command(&config, "definitely-not-a-real-binary-xyz", &[]).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_tail_short_text_unchanged() {
        assert_eq!(tail("hello", 10), "hello");
    }

    #[test]
    fn test_tail_truncates_to_last_chars() {
        let text = "0123456789abcdef";
        assert_eq!(tail(text, 4), "cdef");
    }

    #[test]
    fn test_append_capped_retains_trailing_bytes() {
        let mut buf = vec![0u8; OUTPUT_CAP_BYTES];
        append_capped(&mut buf, b"overflow-marker");
        assert!(buf.len() <= OUTPUT_RETAIN_BYTES + "overflow-marker".len());
        assert!(buf.ends_with(b"overflow-marker"));
    }
}
