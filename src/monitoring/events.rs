//! 工作流的结构化事件与计数指标。

use metrics::counter;
use tracing::{info, warn};

use crate::engine::{RunMode, RunStage};
use crate::notify::{Delivery, NotificationKind};

pub fn stage_transition(task: &str, mode: RunMode, from: RunStage, to: RunStage) {
    info!(
        target: "monitoring::runner",
        event = "stage",
        task,
        mode = mode.label(),
        from = from.as_str(),
        to = to.as_str(),
        "任务阶段切换"
    );
    counter!(
        "robowoofy_stage_total",
        "task" => task.to_string(),
        "stage" => to.as_str()
    )
    .increment(1);
}

pub fn invocation_finished(task: &str, mode: RunMode, stage: RunStage, success: bool) {
    if success {
        info!(
            target: "monitoring::runner",
            event = "finished",
            task,
            mode = mode.label(),
            "任务调用完成"
        );
    } else {
        warn!(
            target: "monitoring::runner",
            event = "finished",
            task,
            mode = mode.label(),
            failed_stage = stage.as_str(),
            "任务调用失败"
        );
    }
    counter!(
        "robowoofy_invocation_total",
        "task" => task.to_string(),
        "mode" => mode.label(),
        "result" => if success { "ok" } else { "error" }
    )
    .increment(1);
}

pub fn notification(kind: NotificationKind, delivery: Delivery) {
    let result = match delivery {
        Delivery::Sent => "sent",
        Delivery::Skipped => "skipped",
        Delivery::Failed => "failed",
    };
    counter!(
        "robowoofy_notification_total",
        "kind" => kind.as_str(),
        "result" => result
    )
    .increment(1);
}
