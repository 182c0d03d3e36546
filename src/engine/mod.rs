// ==========================================
// 通讯录导入管道 - 引擎层
// ==========================================
// 职责: 导入编排（状态机 / 分批 / 进度 / 取消 / 报告）
// 红线: Engine 不拼 SQL
// ==========================================

pub mod orchestrator;
pub mod progress;
pub mod report;

// 重导出核心引擎
pub use orchestrator::{ImportEngine, ImportHandle};
pub use progress::ProgressReporter;
pub use report::build_report;
