use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use crate::error::ReconError;

/// Collected stdout of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub lines: Vec<String>,
}

/// Run `cmd`, optionally feeding `input` on stdin, and collect stdout lines.
///
/// The whole exchange is bounded by `limit`. On timeout the child is dropped
/// and `kill_on_drop` terminates it.
pub async fn run_lines(cmd: &str, args: &[&str], input: Option<String>, limit: Duration) -> Result<CommandOutput, ReconError> {
    let mut command = Command::new(cmd);
    command
        .args(args)
        .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| spawn_error(cmd, e))?;

    if let (Some(data), Some(mut stdin)) = (input, child.stdin.take()) {
        // feed from a separate task so a full stdout pipe can't deadlock us
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(data.as_bytes()).await {
                tracing::debug!(error=%e, "stdin write failed");
            }
        });
    }

    let stdout = child.stdout.take().ok_or_else(|| ReconError::Tool {
        tool: cmd.to_string(),
        message: "stdout not captured".to_string(),
    })?;

    let collect = async move {
        let mut reader = BufReader::new(stdout).lines();
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line().await? {
            lines.push(line);
        }
        let status = child.wait().await?;
        Ok::<_, std::io::Error>(CommandOutput { success: status.success(), lines })
    };

    match tokio::time::timeout(limit, collect).await {
        Ok(Ok(out)) => Ok(out),
        Ok(Err(e)) => Err(ReconError::Tool { tool: cmd.to_string(), message: e.to_string() }),
        Err(_) => Err(ReconError::Tool {
            tool: cmd.to_string(),
            message: format!("timed out after {}s", limit.as_secs_f32()),
        }),
    }
}

fn spawn_error(cmd: &str, e: std::io::Error) -> ReconError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ReconError::tool_absent(cmd)
    } else {
        ReconError::Tool { tool: cmd.to_string(), message: e.to_string() }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collects_stdout_lines_from_stdin() {
        let out = run_lines("cat", &[], Some("a.example.org\nb.example.org\n".into()), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(out.success);
        assert_eq!(out.lines, vec!["a.example.org", "b.example.org"]);
    }

    #[tokio::test]
    async fn missing_binary_is_tool_absent() {
        let err = run_lines("definitely-not-a-real-tool-4711", &[], None, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconError::ToolAbsent { .. }));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let err = run_lines("sleep", &["5"], None, Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, ReconError::Tool { .. }));
    }
}
