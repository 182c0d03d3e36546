// ==========================================
// 通讯录导入管道 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod contact_repo;
pub mod contact_repo_impl;
pub mod error;
pub mod import_audit_repo;
pub mod import_audit_repo_impl;

// 重导出核心仓储
pub use contact_repo::ContactRepository;
pub use contact_repo_impl::SqliteContactRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use import_audit_repo::ImportAuditRepository;
pub use import_audit_repo_impl::SqliteImportAuditRepository;
