use std::fmt;

use crate::monitoring::events;

/// 调用模式，在整个调用期间固定不变。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    DryRun,
    Live,
}

impl RunMode {
    pub fn from_live_flag(live: bool) -> Self {
        if live { RunMode::Live } else { RunMode::DryRun }
    }

    #[cfg(test)]
    pub fn is_live(self) -> bool {
        matches!(self, RunMode::Live)
    }

    pub fn label(self) -> &'static str {
        match self {
            RunMode::DryRun => "dry-run",
            RunMode::Live => "live",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `Init → Recording → Batching → Previewing → {DryRunDone | Submitting → Submitted} → Notified → Done`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Init,
    Recording,
    Batching,
    Previewing,
    DryRunDone,
    Submitting,
    Submitted,
    Notified,
    Done,
}

impl RunStage {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStage::Init => "Init",
            RunStage::Recording => "Recording",
            RunStage::Batching => "Batching",
            RunStage::Previewing => "Previewing",
            RunStage::DryRunDone => "DryRunDone",
            RunStage::Submitting => "Submitting",
            RunStage::Submitted => "Submitted",
            RunStage::Notified => "Notified",
            RunStage::Done => "Done",
        }
    }

    /// 只允许顺序推进；失败时可从任意未通知阶段直接进入 `Notified`。
    pub fn can_advance_to(self, next: RunStage) -> bool {
        use RunStage::*;
        match (self, next) {
            (Init, Recording)
            | (Recording, Batching)
            | (Batching, Previewing)
            | (Previewing, DryRunDone)
            | (Previewing, Submitting)
            | (Submitting, Submitted)
            | (Notified, Done) => true,
            (Notified | Done, Notified) => false,
            (_, Notified) => true,
            _ => false,
        }
    }
}

/// 记录单次调用的阶段轨迹。
#[derive(Debug)]
pub(crate) struct StageTracker {
    task: String,
    mode: RunMode,
    current: RunStage,
    history: Vec<RunStage>,
}

impl StageTracker {
    pub fn new(task: &str, mode: RunMode) -> Self {
        Self {
            task: task.to_string(),
            mode,
            current: RunStage::Init,
            history: vec![RunStage::Init],
        }
    }

    pub fn current(&self) -> RunStage {
        self.current
    }

    pub fn history(&self) -> &[RunStage] {
        &self.history
    }

    pub fn advance(&mut self, next: RunStage) {
        debug_assert!(
            self.current.can_advance_to(next),
            "illegal stage transition {:?} -> {:?}",
            self.current,
            next
        );
        events::stage_transition(&self.task, self.mode, self.current, next);
        self.current = next;
        self.history.push(next);
    }
}
