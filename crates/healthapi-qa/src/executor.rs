//! External command execution with timeout.

use crate::category::CommandSpec;
use crate::obs;
use crate::result::ExecutionResult;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

/// Runs one command and reports what happened.
///
/// Implementations never fail: launch errors and timeouts are reported as
/// failed `ExecutionResult`s so a broken tool cannot stop the suite.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, spec: &CommandSpec) -> ExecutionResult;
}

/// Executes commands as child processes of the orchestrator.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    working_dir: PathBuf,
}

impl ProcessExecutor {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    /// Spawn the command, capture its output and wait for it, killing the
    /// child once the timeout expires. A single attempt, no retries.
    async fn execute(&self, spec: &CommandSpec) -> ExecutionResult {
        obs::emit_command_started(&spec.name, &spec.command);
        let start = Instant::now();

        let Some((exe, args)) = spec.command.split_first() else {
            let result = ExecutionResult::launch_failed(
                &spec.name,
                spec.command.clone(),
                format!("command for {} is empty", spec.name),
                0.0,
            );
            obs::emit_command_finished(&result);
            return result;
        };

        let child = Command::new(exe)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                let result = ExecutionResult::launch_failed(
                    &spec.name,
                    spec.command.clone(),
                    format!("failed to launch {}: {}", exe, e),
                    start.elapsed().as_secs_f64(),
                );
                obs::emit_command_finished(&result);
                return result;
            }
        };

        let timeout = spec.timeout();
        // Dropping the wait future on expiry drops the child, which kills it.
        let result = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => ExecutionResult::completed(
                &spec.name,
                spec.command.clone(),
                output.status.code(),
                String::from_utf8_lossy(&output.stdout).into_owned(),
                String::from_utf8_lossy(&output.stderr).into_owned(),
                start.elapsed().as_secs_f64().min(timeout.as_secs_f64()),
            ),
            Ok(Err(e)) => ExecutionResult::launch_failed(
                &spec.name,
                spec.command.clone(),
                format!("failed waiting for {}: {}", exe, e),
                start.elapsed().as_secs_f64(),
            ),
            Err(_) => ExecutionResult::timed_out(
                &spec.name,
                spec.command.clone(),
                timeout.as_secs_f64(),
            ),
        };

        obs::emit_command_finished(&result);
        result
    }
}
