// ==========================================
// 通讯录导入管道 - 联系人 Repository Trait
// ==========================================
// 职责: 定义联系人数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::contact::Contact;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// ContactRepository Trait
// ==========================================
// 用途: 联系人存储（导入引擎的持久化协作者）
// 实现者: SqliteContactRepository（使用 rusqlite）
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// 查询全部联系人（按创建时间升序）
    ///
    /// 重复检测开始时用作快照
    async fn get_all(&self) -> RepositoryResult<Vec<Contact>>;

    /// 按 ID 查询联系人
    ///
    /// # 返回
    /// - Ok(None): 不存在
    async fn get_by_id(&self, contact_id: &str) -> RepositoryResult<Option<Contact>>;

    /// 插入联系人
    ///
    /// # 参数
    /// - contact: id 为 None 时由 Store 分配 UUID
    ///
    /// # 返回
    /// - Ok(String): 落库后的联系人 ID
    async fn insert(&self, contact: &Contact) -> RepositoryResult<String>;

    /// 更新联系人（按 ID 覆盖全部字段，updated_at 由 Store 刷新）
    ///
    /// # 返回
    /// - Err(NotFound): id 为空或记录不存在
    async fn update(&self, contact: &Contact) -> RepositoryResult<()>;

    /// 按电话或邮箱精确查找（邮箱不区分大小写）
    ///
    /// # 参数
    /// - phone / email: 任一为 None 时忽略该条件
    async fn find_by_phone_or_email(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> RepositoryResult<Vec<Contact>>;
}
