use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::SafeService;
use crate::monitoring::events;
use crate::notify::{NotificationEvent, Notifier};
use crate::rpc::ChainSimulator;
use crate::safe::{SafeContext, SafeTransaction};
use crate::wallet::CredentialSource;

use super::batcher::Batcher;
use super::error::{RunError, TaskError};
use super::preview::Previewer;
use super::recorder::CallRecorder;
use super::stage::{RunMode, RunStage, StageTracker};
use super::submit::Submitter;
use super::task::Task;

/// 单次任务调用的编排：记录 → 打包 → 预览 → (dry-run | 签名提交) → 通知。
///
/// 同一 Safe 的调用需由调用方串行化；nonce 以 Safe 服务为准，进程内不做协调。
pub struct TaskRunner {
    safe: SafeContext,
    simulator: Arc<dyn ChainSimulator>,
    batcher: Batcher,
    previewer: Previewer,
    submitter: Submitter,
    notifier: Notifier,
}

impl TaskRunner {
    pub fn new(
        safe: SafeContext,
        simulator: Arc<dyn ChainSimulator>,
        service: Arc<dyn SafeService>,
        credentials: Arc<dyn CredentialSource>,
        notifier: Notifier,
    ) -> Self {
        Self {
            batcher: Batcher::new(service.clone(), safe.multisend),
            previewer: Previewer::new(simulator.clone()),
            submitter: Submitter::new(service, credentials),
            safe,
            simulator,
            notifier,
        }
    }

    pub fn safe(&self) -> &SafeContext {
        &self.safe
    }

    /// 执行任务并返回编译好的批次。无论成功与否都恰好发送一条通知。
    pub async fn run(
        &self,
        task: &dyn Task,
        mode: RunMode,
        nonce: Option<u64>,
    ) -> Result<SafeTransaction, RunError> {
        let name = task.name().to_string();
        let mut stages = StageTracker::new(&name, mode);
        info!(
            target: "runner",
            safe = %self.safe.address,
            chain_id = self.safe.chain_id,
            task = %name,
            mode = mode.label(),
            "操作多签钱包"
        );

        let (event, result) = match self.drive(task, mode, nonce, &mut stages).await {
            Ok((transaction, event)) => (event, Ok(transaction)),
            Err(source) => {
                let stage = stages.current();
                warn!(
                    target: "runner",
                    task = %name,
                    mode = mode.label(),
                    stage = stage.as_str(),
                    error = %source,
                    "任务调用中止"
                );
                let event = NotificationEvent::Failed {
                    task: name.clone(),
                    mode,
                    stage,
                    error: source.to_string(),
                };
                let error = RunError {
                    task: name.clone(),
                    mode,
                    stage,
                    source,
                };
                (event, Err(error))
            }
        };

        let failed_stage = stages.current();
        stages.advance(RunStage::Notified);
        self.notifier.notify(&event).await;
        stages.advance(RunStage::Done);
        debug!(target: "runner", task = %name, stages = ?stages.history(), "阶段轨迹");
        events::invocation_finished(&name, mode, failed_stage, result.is_ok());
        result
    }

    async fn drive(
        &self,
        task: &dyn Task,
        mode: RunMode,
        nonce: Option<u64>,
        stages: &mut StageTracker,
    ) -> Result<(SafeTransaction, NotificationEvent), TaskError> {
        stages.advance(RunStage::Recording);
        let mut recorder = CallRecorder::new(self.safe.address, self.simulator.clone());
        task.execute(&mut recorder).await?;

        stages.advance(RunStage::Batching);
        let nonce = self.batcher.select_nonce(self.safe.address, nonce).await?;
        let transaction = self
            .batcher
            .compile(self.safe.address, nonce, recorder.into_calls());

        stages.advance(RunStage::Previewing);
        self.previewer.preview(&transaction).await?;

        let event = match mode {
            RunMode::DryRun => {
                stages.advance(RunStage::DryRunDone);
                NotificationEvent::DryRunCompleted {
                    task: task.name().to_string(),
                    nonce: transaction.nonce,
                    calls: transaction.calls().len(),
                }
            }
            RunMode::Live => {
                stages.advance(RunStage::Submitting);
                let safe_tx_hash = self.submitter.submit(&self.safe, &transaction).await?;
                stages.advance(RunStage::Submitted);
                NotificationEvent::TransactionQueued {
                    task: task.name().to_string(),
                    nonce: transaction.nonce,
                    safe_tx_hash,
                    url: self.safe.transaction_url(&safe_tx_hash),
                }
            }
        };
        Ok((transaction, event))
    }
}
