//! 编排状态机与阶段进度
use serde::Serialize;
use tokio::time::Instant;

use crate::config::ProgressSender;

/// 编排阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Idle,
    Retrieving,
    /// 含外链样式表采集
    Parsing,
    Detecting,
    Aggregating,
    Done,
    Failed,
}

impl Stage {
    /// 合法迁移：Failed 只能来自 Retrieving / Parsing；Detecting 总是进入 Aggregating
    pub fn can_transition_to(self, next: Stage) -> bool {
        matches!(
            (self, next),
            (Stage::Idle, Stage::Retrieving)
                | (Stage::Retrieving, Stage::Parsing)
                | (Stage::Retrieving, Stage::Failed)
                | (Stage::Parsing, Stage::Detecting)
                | (Stage::Parsing, Stage::Failed)
                | (Stage::Detecting, Stage::Aggregating)
                | (Stage::Aggregating, Stage::Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

/// 阶段进度事件（单次运行内使用同一单调时钟）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageEvent {
    pub stage: Stage,
    pub elapsed_ms: u64,
}

/// 单次运行的状态跟踪器
/// 进度通知即发即弃：接收端关闭或积压都不会阻塞编排
#[derive(Debug)]
pub(crate) struct StageTracker {
    started: Instant,
    current: Stage,
    timeline: Vec<StageEvent>,
    progress: Option<ProgressSender>,
}

impl StageTracker {
    pub(crate) fn new(progress: Option<ProgressSender>) -> Self {
        let mut tracker = Self {
            started: Instant::now(),
            current: Stage::Idle,
            timeline: Vec::with_capacity(6),
            progress,
        };
        tracker.record(Stage::Idle);
        tracker
    }

    pub(crate) fn started(&self) -> Instant {
        self.started
    }

    pub(crate) fn transition(&mut self, next: Stage) {
        if !self.current.can_transition_to(next) {
            log::warn!(
                "Unexpected stage transition {:?} -> {:?}",
                self.current,
                next
            );
        }
        self.current = next;
        self.record(next);
    }

    pub(crate) fn timeline(&self) -> Vec<StageEvent> {
        self.timeline.clone()
    }

    fn record(&mut self, stage: Stage) {
        let event = StageEvent {
            stage,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        };
        self.timeline.push(event);
        if let Some(sender) = &self.progress {
            // 接收端已关闭时静默丢弃
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_transition_table() {
        assert!(Stage::Idle.can_transition_to(Stage::Retrieving));
        assert!(Stage::Retrieving.can_transition_to(Stage::Failed));
        assert!(Stage::Parsing.can_transition_to(Stage::Failed));
        assert!(!Stage::Detecting.can_transition_to(Stage::Failed));
        assert!(Stage::Detecting.can_transition_to(Stage::Aggregating));
        assert!(!Stage::Idle.can_transition_to(Stage::Detecting));
        assert!(Stage::Done.is_terminal());
    }

    #[tokio::test]
    async fn test_tracker_emits_monotonic_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tracker = StageTracker::new(Some(tx));
        tracker.transition(Stage::Retrieving);
        tracker.transition(Stage::Parsing);

        let timeline = tracker.timeline();
        let stages: Vec<Stage> = timeline.iter().map(|e| e.stage).collect();
        assert_eq!(stages, vec![Stage::Idle, Stage::Retrieving, Stage::Parsing]);
        assert!(timeline.windows(2).all(|w| w[0].elapsed_ms <= w[1].elapsed_ms));

        let mut received = Vec::new();
        while let Ok(event) = rx.try_recv() {
            received.push(event);
        }
        assert_eq!(received, timeline);
    }

    #[test]
    fn test_closed_receiver_does_not_block() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut tracker = StageTracker::new(Some(tx));
        tracker.transition(Stage::Retrieving);
        assert_eq!(tracker.timeline().last().map(|e| e.stage), Some(Stage::Retrieving));
    }
}
