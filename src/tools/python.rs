//! Python tool - executes a code string and reports its `result` binding
//!
//! The code runs in a fresh, empty namespace inside a `python3` child
//! process with the full privileges of this server: file system, network,
//! process control. There are no resource limits and no timeout; only an
//! explicit cancellation stops it. Never point this at untrusted input.

use super::{Tool, ToolContext, ToolOutput};
use crate::prompts;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[cfg(unix)]
use nix::sys::signal::{killpg, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Name of the variable read back after execution
pub const RESULT_VARIABLE: &str = "result";

/// Runs stdin as Python source and prints one verdict line after `argv[1]`.
///
/// Output the code prints itself is captured and dropped so it cannot be
/// confused with the verdict.
const DRIVER: &str = r#"
import contextlib, io, json, sys

marker = sys.argv[1]
source = sys.stdin.read()
namespace = {}
try:
    with contextlib.redirect_stdout(io.StringIO()):
        exec(source, namespace)
    if "result" in namespace:
        verdict = {"status": "ok", "result": str(namespace["result"])}
    else:
        verdict = {"status": "ok", "result": None}
except BaseException as e:
    verdict = {"status": "error", "message": str(e)}
sys.__stdout__.write("\n" + marker + json.dumps(verdict) + "\n")
sys.__stdout__.flush()
"#;

#[derive(Debug, Deserialize)]
struct PythonInput {
    code: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Verdict {
    Ok { result: Option<String> },
    Error { message: String },
}

/// Python tool for code execution
pub struct PythonTool {
    interpreter: String,
}

impl PythonTool {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    /// Execute `code` and return the display text.
    ///
    /// Every failure is folded into the returned output; nothing is raised.
    pub async fn execute(&self, code: &str, ctx: &ToolContext) -> ToolOutput {
        match self.run_driver(code, ctx).await {
            Ok(Verdict::Ok { result }) => {
                let value = result.unwrap_or_else(|| prompts::NO_EXEC_OUTPUT.to_string());
                ToolOutput::success(prompts::executed_output(&value))
            }
            Ok(Verdict::Error { message }) => {
                tracing::debug!(error = %message, "Python code raised");
                ToolOutput::error(prompts::execution_error(&message))
            }
            Err(message) => {
                tracing::warn!(error = %message, interpreter = %self.interpreter, "Python execution failed");
                ToolOutput::error(prompts::execution_error(&message))
            }
        }
    }

    async fn run_driver(&self, code: &str, ctx: &ToolContext) -> Result<Verdict, String> {
        let marker = format!("@@verdict-{}@@", uuid::Uuid::new_v4().simple());

        let mut cmd = Command::new(&self.interpreter);
        cmd.args(["-c", DRIVER, &marker])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group so cancellation reaches anything the code spawns
        #[cfg(unix)]
        unsafe {
            cmd.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0)).ok();
                Ok(())
            });
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| format!("failed to start {}: {e}", self.interpreter))?;
        let group = ProcessGroupGuard { pid: child.id() };

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| "interpreter stdin is unavailable".to_string())?;
        stdin
            .write_all(code.as_bytes())
            .await
            .map_err(|e| format!("failed to send code to interpreter: {e}"))?;
        drop(stdin);

        let output = tokio::select! {
            biased;

            () = ctx.cancel.cancelled() => {
                return Err("execution cancelled".to_string());
            }

            result = child.wait_with_output() => {
                result.map_err(|e| format!("failed waiting for interpreter: {e}"))?
            }
        };
        group.disarm();

        let stdout = String::from_utf8_lossy(&output.stdout);
        let verdict_line = stdout
            .lines()
            .rev()
            .find_map(|line| line.strip_prefix(marker.as_str()));

        match verdict_line {
            Some(line) => serde_json::from_str(line)
                .map_err(|e| format!("unreadable interpreter verdict: {e}")),
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(format!(
                    "interpreter exited ({}) without a result: {}",
                    output.status,
                    stderr.trim()
                ))
            }
        }
    }

    /// Kill a process group immediately with SIGKILL.
    #[cfg(unix)]
    fn kill_process_group(pid: Option<u32>) {
        let Some(pgid) = pid.and_then(|p| i32::try_from(p).ok()) else {
            return;
        };
        tracing::debug!(pgid, "Sending SIGKILL to process group");
        let _ = killpg(Pid::from_raw(pgid), Signal::SIGKILL);
    }

    #[cfg(not(unix))]
    fn kill_process_group(_pid: Option<u32>) {}
}

/// SIGKILLs the interpreter's process group on drop unless disarmed.
///
/// Covers cancellation and a caller that drops the execution future, e.g. an
/// HTTP client that disconnects mid-run.
struct ProcessGroupGuard {
    pid: Option<u32>,
}

impl ProcessGroupGuard {
    fn disarm(mut self) {
        self.pid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if self.pid.is_some() {
            PythonTool::kill_process_group(self.pid);
        }
    }
}

#[async_trait]
impl Tool for PythonTool {
    fn name(&self) -> &'static str {
        "execute_python"
    }

    fn description(&self) -> String {
        format!(
            "Executes Python code and returns the result. Assign the value to return to a \
             variable named `{RESULT_VARIABLE}`. The code runs unsandboxed with full host access."
        )
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["code"],
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Python source to execute"
                }
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        match serde_json::from_value::<PythonInput>(input) {
            Ok(input) => self.execute(&input.code, &ctx).await,
            Err(e) => ToolOutput::error(prompts::execution_error(&format!("Invalid input: {e}"))),
        }
    }
}
