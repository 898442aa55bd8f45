//! Background completion of pending tasks.
//!
//! Every interval the worker drains all `pending` tasks oldest first, asks
//! the model for a deliverable, writes it to
//! `completed_tasks/<task-id>.<ext>` in the owner's workspace and marks the
//! task completed. One task failing never stops the sweep.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::ai::{AiClient, Message};
use crate::db::Store;
use crate::error::EdgeError;
use crate::models::{Task, TaskStatus, TaskUpdate};
use crate::orchestrator::prompts::deliverable_prompt;
use crate::orchestrator::strip_code_fences;
use crate::workspace::WorkspaceResolver;

static CODE_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(python|script|code)\b|\.py\b").expect("valid regex"));
static MARKDOWN_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bmarkdown\b|\.md\b").expect("valid regex"));

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub completed: usize,
    pub failed: usize,
}

pub struct TaskCompletionWorker {
    store: Arc<dyn Store>,
    workspace: Arc<WorkspaceResolver>,
    ai: Option<Arc<AiClient>>,
    interval: Duration,
}

impl TaskCompletionWorker {
    pub fn new(
        store: Arc<dyn Store>,
        workspace: Arc<WorkspaceResolver>,
        ai: Option<Arc<AiClient>>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            workspace,
            ai,
            interval,
        }
    }

    /// Run until `cancel` fires. The first sweep happens immediately.
    pub async fn run(self, cancel: CancellationToken) {
        log::info!(
            "[TASK_WORKER] started, polling every {}s",
            self.interval.as_secs()
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::info!("[TASK_WORKER] shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.run_cycle().await;
                    if report.completed > 0 || report.failed > 0 {
                        log::info!(
                            "[TASK_WORKER] cycle done: {} completed, {} failed",
                            report.completed,
                            report.failed
                        );
                    }
                }
            }
        }
    }

    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let pending = match self.store.list_tasks_by_status(TaskStatus::Pending).await {
            Ok(tasks) => tasks,
            Err(e) => {
                log::error!("[TASK_WORKER] failed to query pending tasks: {}", e);
                return report;
            }
        };
        if pending.is_empty() {
            return report;
        }
        log::info!("[TASK_WORKER] auto-completing {} pending task(s)", pending.len());

        for task in pending {
            match self.complete(&task).await {
                Ok(path) => {
                    log::info!("[TASK_WORKER] task {} completed with deliverable {}", task.id, path);
                    report.completed += 1;
                }
                Err(e) => {
                    log::error!("[TASK_WORKER] task {} left pending: {}", task.id, e);
                    report.failed += 1;
                }
            }
        }
        report
    }

    async fn complete(&self, task: &Task) -> Result<String, EdgeError> {
        let ext = deliverable_extension(&task.description);
        let relative = format!("completed_tasks/{}.{}", task.id, ext);

        let content = match &self.ai {
            Some(ai) => {
                let reply = ai
                    .generate_text(vec![Message::user(deliverable_prompt(
                        task.assigned_to_role,
                        &task.description,
                    ))])
                    .await?;
                strip_code_fences(&reply)
            }
            None => format!("AUTO-GENERATED PLACEHOLDER FOR TASK: {}", task.description),
        };

        self.workspace.write(&task.user_id, &relative, content).await?;

        let mut resources = task.resources.clone();
        if !resources.contains(&relative) {
            resources.push(relative.clone());
        }
        let update = TaskUpdate {
            status: Some(TaskStatus::Completed),
            resources: Some(resources),
            ..Default::default()
        };
        self.store
            .update_task(&task.id, update)
            .await?
            .ok_or_else(|| EdgeError::NotFound(format!("task {} disappeared", task.id)))?;
        Ok(relative)
    }
}

/// File extension for a deliverable, from keywords in the task description.
pub fn deliverable_extension(description: &str) -> &'static str {
    if CODE_HINT.is_match(description) {
        "py"
    } else if MARKDOWN_HINT.is_match(description) {
        "md"
    } else {
        "txt"
    }
}
