// ==========================================
// 通讯录导入管道 - 导入审计 Repository Trait
// ==========================================
// 职责: 导入批次记录与行级明细的读写接口
// 对齐: import_record / import_detail 表
// 约束: 行级明细一经写入不再修改
// ==========================================

use crate::domain::import::{ImportRecord, RowImportResult};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// ImportAuditRepository Trait
// ==========================================
// 实现者: SqliteImportAuditRepository（使用 rusqlite）
#[async_trait]
pub trait ImportAuditRepository: Send + Sync {
    // ===== 批次记录 =====

    /// 新建导入批次记录
    async fn save_import_record(&self, record: &ImportRecord) -> RepositoryResult<()>;

    /// 覆盖更新导入批次记录（状态 / 计数 / 映射 / 错误信息）
    ///
    /// # 返回
    /// - Err(NotFound): 记录不存在
    async fn update_import_record(&self, record: &ImportRecord) -> RepositoryResult<()>;

    /// 按 ID 查询导入批次记录
    async fn get_import_record(&self, import_id: &str) -> RepositoryResult<Option<ImportRecord>>;

    /// 最近的导入批次（按开始时间倒序）
    ///
    /// # 参数
    /// - limit: 最大返回条数
    async fn list_recent_imports(&self, limit: usize) -> RepositoryResult<Vec<ImportRecord>>;

    // ===== 行级明细 =====

    /// 写入单行明细
    ///
    /// # 返回
    /// - Err(UniqueConstraintViolation): 同一行重复写入
    async fn save_import_detail(&self, detail: &RowImportResult) -> RepositoryResult<()>;

    /// 查询批次的全部行明细（按行号升序）
    async fn list_import_details(&self, import_id: &str) -> RepositoryResult<Vec<RowImportResult>>;

    /// 统计批次的行明细数量
    async fn count_import_details(&self, import_id: &str) -> RepositoryResult<usize>;
}
