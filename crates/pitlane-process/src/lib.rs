//! C4 — the streaming child-process executor. Spawns a child with stdin
//! detached, drains stdout/stderr concurrently so neither stream's pipe
//! buffer can fill and deadlock the child, enforces a wall-clock timeout,
//! and reports whether the child was killed for running over it.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Outcome of a single streamed child-process invocation.
#[derive(Debug, Clone)]
pub struct StreamedOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
}

async fn drain<R>(reader: R, stream_name: &'static str) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut buf = String::new();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(stream = stream_name, "{}", line);
        buf.push_str(&line);
        buf.push('\n');
    }
    buf
}

/// Spawn `cmd` (argv[0] is the program) in `workdir`, tee stdout/stderr into
/// buffers while logging each line at debug level, and enforce `timeout` as
/// a wall-clock deadline measured from spawn. On timeout the child is
/// killed and reader tasks are always joined afterwards so that output
/// emitted between the kill signal and the child's death is not lost.
pub async fn run_streaming(
    cmd: &[String],
    workdir: &Path,
    timeout: Duration,
    env: Option<&HashMap<String, String>>,
) -> anyhow::Result<StreamedOutput> {
    anyhow::ensure!(!cmd.is_empty(), "cmd must have at least a program name");

    let mut command = Command::new(&cmd[0]);
    command
        .args(&cmd[1..])
        .current_dir(workdir)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped());
    if let Some(env) = env {
        command.envs(env);
    }

    let start = Instant::now();
    let mut child = command.spawn()?;

    let stdout = child.stdout.take().expect("stdout piped");
    let stderr = child.stderr.take().expect("stderr piped");
    let stdout_task = tokio::spawn(drain(stdout, "stdout"));
    let stderr_task = tokio::spawn(drain(stderr, "stderr"));

    let timed_out;
    let exit_code;
    tokio::select! {
        status = child.wait() => {
            timed_out = false;
            exit_code = exit_code_of(status?);
        }
        _ = tokio::time::sleep(timeout) => {
            timed_out = true;
            let _ = child.kill().await;
            exit_code = exit_code_of(child.wait().await?);
        }
    }

    // Always join the readers, even on the timeout path, so buffered output
    // emitted between kill and death is not lost.
    let stdout_buf = stdout_task.await.unwrap_or_default();
    let stderr_buf = stderr_task.await.unwrap_or_default();

    tracing::debug!(
        elapsed_s = start.elapsed().as_secs_f64(),
        exit_code,
        timed_out,
        "child process finished"
    );

    Ok(StreamedOutput {
        stdout: stdout_buf,
        stderr: stderr_buf,
        exit_code,
        timed_out,
    })
}

fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status.code().unwrap_or_else(|| -status.signal().unwrap_or(0))
    }
    #[cfg(not(unix))]
    {
        status.code().unwrap_or(-1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_streaming_captures_stdout_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_streaming(
            &["echo".to_string(), "hello".to_string()],
            dir.path(),
            Duration::from_secs(5),
            None,
        )
        .await
        .unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.exit_code, 0);
        assert!(!out.timed_out);
    }

    #[tokio::test]
    async fn test_run_streaming_captures_nonzero_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_streaming(
            &["sh".to_string(), "-c".to_string(), "exit 7".to_string()],
            dir.path(),
            Duration::from_secs(5),
            None,
        )
        .await
        .unwrap();
        assert_eq!(out.exit_code, 7);
    }

    #[tokio::test]
    async fn test_run_streaming_times_out_and_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_streaming(
            &["sleep".to_string(), "30".to_string()],
            dir.path(),
            Duration::from_millis(200),
            None,
        )
        .await
        .unwrap();
        assert!(out.timed_out);
    }

    #[tokio::test]
    async fn test_run_streaming_captures_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_streaming(
            &["sh".to_string(), "-c".to_string(), "echo oops 1>&2".to_string()],
            dir.path(),
            Duration::from_secs(5),
            None,
        )
        .await
        .unwrap();
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_run_streaming_passes_custom_env() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = HashMap::new();
        env.insert("PITLANE_TEST_VAR".to_string(), "expected".to_string());
        let out = run_streaming(
            &["sh".to_string(), "-c".to_string(), "echo $PITLANE_TEST_VAR".to_string()],
            dir.path(),
            Duration::from_secs(5),
            Some(&env),
        )
        .await
        .unwrap();
        assert_eq!(out.stdout.trim(), "expected");
    }
}
