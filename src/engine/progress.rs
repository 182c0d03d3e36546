// ==========================================
// 通讯录导入管道 - 进度上报器
// ==========================================
// 职责: 维护单次导入的最新进度快照（watch 通道，仅保留最新值）
// 约束: 同一次运行内进度单调不减；步骤只允许前进
// ==========================================

use crate::domain::import::{ImportCounters, ImportProgress};
use crate::domain::types::ImportStep;
use crate::i18n::t;
use crate::importer::error::{ImportError, ImportResult};
use tokio::sync::watch;

/// IMPORTING_DATA 阶段可用的进度区间
const IMPORTING_SPAN: f64 = 1.0 - 0.35;

/// 进度上报器（单写者）
///
/// 编排器独占持有；读者通过 `subscribe` 获得的 Receiver 只能读取最新快照
pub struct ProgressReporter {
    tx: watch::Sender<ImportProgress>,
}

impl ProgressReporter {
    pub fn new(import_id: &str) -> Self {
        let mut initial = ImportProgress::initial(import_id);
        initial.message = t("import.step.initializing");
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<ImportProgress> {
        self.tx.subscribe()
    }

    /// 当前快照
    pub fn snapshot(&self) -> ImportProgress {
        self.tx.borrow().clone()
    }

    pub fn step(&self) -> ImportStep {
        self.tx.borrow().step
    }

    /// 状态机是否允许从当前步骤进入 step（不发布）
    pub fn check_transition(&self, step: ImportStep) -> ImportResult<()> {
        let current = self.step();
        if !current.can_transition_to(step) {
            return Err(ImportError::InvalidStateTransition {
                from: current.to_string(),
                to: step.to_string(),
            });
        }
        Ok(())
    }

    /// 进入新步骤
    ///
    /// # 错误
    /// - 状态机不允许的转换 → InvalidStateTransition
    pub fn enter(
        &self,
        step: ImportStep,
        counters: ImportCounters,
        message: String,
    ) -> ImportResult<()> {
        self.check_transition(step)?;
        let current = self.step();

        tracing::info!(from = %current, to = %step, "导入步骤切换");
        self.publish(step, step.base_progress(), counters, message);
        Ok(())
    }

    /// IMPORTING_DATA 内的批次进度
    pub fn batch_progress(&self, counters: ImportCounters, message: String) {
        let ratio = if counters.total == 0 {
            1.0
        } else {
            counters.processed as f64 / counters.total as f64
        };
        let progress = ImportStep::ImportingData.base_progress() + IMPORTING_SPAN * ratio;
        self.publish(ImportStep::ImportingData, progress, counters, message);
    }

    /// 终态 FAILED（可从任意非终态进入，进度保持当前值）
    pub fn fail(&self, counters: ImportCounters, message: String) {
        let current = self.step();
        if current.is_terminal() {
            tracing::warn!(step = %current, "导入已处于终态，忽略失败上报");
            return;
        }
        self.publish(ImportStep::Failed, 0.0, counters, message);
    }

    fn publish(&self, step: ImportStep, progress: f64, counters: ImportCounters, message: String) {
        self.tx.send_modify(|snapshot| {
            snapshot.step = step;
            snapshot.progress = progress.clamp(0.0, 1.0).max(snapshot.progress);
            snapshot.counters = counters;
            snapshot.message = message;
        });
    }
}
