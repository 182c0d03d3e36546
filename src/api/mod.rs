// ==========================================
// 通讯录导入管道 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供命令行入口与集成方调用
// ==========================================

pub mod error;
pub mod import_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::ImportApi;
