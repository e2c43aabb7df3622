use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use super::output::{failure_from_output, parse_item_line, render_args};
use super::Collaborator;
use crate::checkpoint::DiscoveredItem;
use crate::retry::OperationFailure;

/// Collaborator that runs an external program once per operation.
#[derive(Debug, Clone)]
pub struct CommandCollaborator {
    program: String,
    perform_args: Vec<String>,
    enumerate_args: Vec<String>,
}

impl CommandCollaborator {
    pub fn new(
        program: impl Into<String>,
        perform_args: Vec<String>,
        enumerate_args: Vec<String>,
    ) -> Self {
        Self {
            program: program.into(),
            perform_args,
            enumerate_args,
        }
    }

    fn command(&self, args: Vec<String>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_failure(&self, e: std::io::Error) -> OperationFailure {
        OperationFailure::message(format!("could not start {}: {}", self.program, e))
    }
}

#[async_trait]
impl Collaborator for CommandCollaborator {
    async fn perform(&self, source_reference: &str, identity: &str) -> Result<(), OperationFailure> {
        let args = render_args(&self.perform_args, source_reference, identity);
        tracing::debug!(program = %self.program, ?args, "running collaborator");
        let output = self
            .command(args)
            .stdout(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_failure(e))?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(failure_from_output(&stderr, &output.status.to_string()))
    }

    async fn enumerate(
        &self,
        source: &str,
        identity: &str,
        items: mpsc::Sender<DiscoveredItem>,
    ) -> Result<(), OperationFailure> {
        let args = render_args(&self.enumerate_args, source, identity);
        tracing::debug!(program = %self.program, ?args, "running enumeration");
        let mut child = self
            .command(args)
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_failure(e))?;

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf).await;
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Some(item) = parse_item_line(&line) {
                            if items.send(item).await.is_err() {
                                // Receiver gone: the run is stopping.
                                let _ = child.start_kill();
                                break;
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(source, "reading enumeration output failed: {}", e);
                        break;
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| OperationFailure::message(format!("waiting for {}: {}", self.program, e)))?;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        if status.success() {
            Ok(())
        } else {
            Err(failure_from_output(&stderr, &status.to_string()))
        }
    }
}
