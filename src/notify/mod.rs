//! 运营群通知：每次任务调用恰好发送一条，投递失败只记录日志。

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::B256;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::engine::{RunMode, RunStage};
use crate::monitoring::events;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("通知发送超时（{timeout_ms}ms）")]
    Timeout { timeout_ms: u64 },
    #[error("通知通道不可达: {0}")]
    Transport(String),
    #[error("通知通道拒绝消息，状态 {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// 接收格式化文本（Telegram HTML 子集）的通知通道。
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    DryRunCompleted,
    TransactionQueued,
    Failed,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::DryRunCompleted => "dry_run_completed",
            NotificationKind::TransactionQueued => "transaction_queued",
            NotificationKind::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    DryRunCompleted {
        task: String,
        nonce: u64,
        calls: usize,
    },
    TransactionQueued {
        task: String,
        nonce: u64,
        safe_tx_hash: B256,
        url: String,
    },
    Failed {
        task: String,
        mode: RunMode,
        stage: RunStage,
        error: String,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationEvent::DryRunCompleted { .. } => NotificationKind::DryRunCompleted,
            NotificationEvent::TransactionQueued { .. } => NotificationKind::TransactionQueued,
            NotificationEvent::Failed { .. } => NotificationKind::Failed,
        }
    }

    pub fn render(&self) -> String {
        match self {
            NotificationEvent::DryRunCompleted { task, nonce, calls } => format!(
                "🟢 🐶 <b>woof!</b>\n<code>{}</code> dry-run 完成（nonce {nonce}，{calls} 笔调用）",
                escape_html(task)
            ),
            NotificationEvent::TransactionQueued {
                task,
                nonce,
                safe_tx_hash,
                url,
            } => format!(
                "🐶 <b>woof!</b>\n<code>{}</code> 已排队 nonce {nonce}\n<a href=\"{}\">{:#x}</a>",
                escape_html(task),
                escape_html(url),
                safe_tx_hash
            ),
            NotificationEvent::Failed {
                task,
                mode,
                stage,
                error,
            } => {
                let hint = match mode {
                    RunMode::DryRun => "修复后重新执行即可",
                    RunMode::Live => "请人工确认链上与 Safe 队列状态",
                };
                format!(
                    "🔴 🐶 <b>woof 失败</b> [{}]\n<code>{}</code> 在 {} 阶段失败: {}\n{hint}",
                    mode.label(),
                    escape_html(task),
                    stage.as_str(),
                    escape_html(error)
                )
            }
        }
    }
}

/// 投递结果，仅用于日志与测试断言。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Skipped,
    Failed,
}

#[derive(Clone)]
pub struct Notifier {
    sink: Option<Arc<dyn NotificationSink>>,
    timeout: Duration,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>, timeout: Duration) -> Self {
        Self {
            sink: Some(sink),
            timeout,
        }
    }

    /// 未配置通道时事件只写日志。
    pub fn disabled() -> Self {
        Self {
            sink: None,
            timeout: Duration::ZERO,
        }
    }

    /// 发送事件；任何失败都在此处吞掉并记录，不影响调用结果。
    pub async fn notify(&self, event: &NotificationEvent) -> Delivery {
        let kind = event.kind();
        let Some(sink) = self.sink.as_ref() else {
            info!(
                target: "notify",
                kind = kind.as_str(),
                "未配置通知通道，跳过发送"
            );
            events::notification(kind, Delivery::Skipped);
            return Delivery::Skipped;
        };

        let text = event.render();
        let outcome = match tokio::time::timeout(self.timeout, sink.send(&text)).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        };

        let delivery = match outcome {
            Ok(()) => {
                info!(
                    target: "notify",
                    sink = sink.name(),
                    kind = kind.as_str(),
                    "通知已发送"
                );
                Delivery::Sent
            }
            Err(err) => {
                warn!(
                    target: "notify",
                    sink = sink.name(),
                    kind = kind.as_str(),
                    error = %err,
                    "通知发送失败，已忽略"
                );
                Delivery::Failed
            }
        };
        events::notification(kind, delivery);
        delivery
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSink {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn send(&self, text: &str) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(text.to_string());
            if self.fail {
                Err(NotifyError::Transport("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    struct StuckSink;

    #[async_trait]
    impl NotificationSink for StuckSink {
        fn name(&self) -> &'static str {
            "stuck"
        }

        async fn send(&self, _text: &str) -> Result<(), NotifyError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    fn dry_run_event() -> NotificationEvent {
        NotificationEvent::DryRunCompleted {
            task: "woofy".to_string(),
            nonce: 3,
            calls: 1,
        }
    }

    #[tokio::test]
    async fn delivery_failure_is_swallowed() {
        let sink = Arc::new(RecordingSink {
            sent: Mutex::new(Vec::new()),
            fail: true,
        });
        let notifier = Notifier::new(sink.clone(), Duration::from_secs(1));
        assert_eq!(notifier.notify(&dry_run_event()).await, Delivery::Failed);
        assert_eq!(sink.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_channel_is_bounded_by_timeout() {
        let notifier = Notifier::new(Arc::new(StuckSink), Duration::from_millis(50));
        assert_eq!(notifier.notify(&dry_run_event()).await, Delivery::Failed);
    }

    #[tokio::test]
    async fn missing_channel_skips_delivery() {
        assert_eq!(
            Notifier::disabled().notify(&dry_run_event()).await,
            Delivery::Skipped
        );
    }

    #[test]
    fn failure_wording_distinguishes_modes() {
        let failed = |mode| NotificationEvent::Failed {
            task: "woofy".to_string(),
            mode,
            stage: RunStage::Submitting,
            error: "nonce <7> already used".to_string(),
        };
        let dry = failed(RunMode::DryRun).render();
        let live = failed(RunMode::Live).render();
        assert!(dry.contains("[dry-run]"));
        assert!(live.contains("[live]"));
        assert_ne!(dry, live);
        assert!(live.contains("nonce &lt;7&gt; already used"));
    }

    #[test]
    fn queued_message_links_transaction() {
        let event = NotificationEvent::TransactionQueued {
            task: "woofy".to_string(),
            nonce: 9,
            safe_tx_hash: B256::repeat_byte(0x01),
            url: "https://app.safe.global/transactions/tx?safe=eth:0x1&id=x".to_string(),
        };
        let text = event.render();
        assert!(text.starts_with("🐶 <b>woof!</b>"));
        assert!(text.contains("safe=eth:0x1&amp;id=x"));
        assert_eq!(event.kind(), NotificationKind::TransactionQueued);
    }
}
