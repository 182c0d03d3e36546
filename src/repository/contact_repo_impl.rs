// ==========================================
// 通讯录导入管道 - 联系人 Repository 实现
// ==========================================
// 职责: 实现联系人数据访问（使用 rusqlite）
// 存储: contacts 表；tags / custom_fields 以 JSON 文本存储
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::contact::Contact;
use crate::repository::contact_repo::ContactRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

const SELECT_COLUMNS: &str = r#"
    contact_id, name, phone, email, company, position, address, birthday, notes,
    tags_json, custom_fields_json, created_at, updated_at
"#;

// ==========================================
// SqliteContactRepository
// ==========================================
pub struct SqliteContactRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteContactRepository {
    /// 从共享连接创建仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 打开数据库文件创建仓储
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 行 → Contact
    fn map_row(row: &Row) -> rusqlite::Result<Contact> {
        let tags_json: String = row.get(9)?;
        let custom_json: String = row.get(10)?;

        let tags = serde_json::from_str(&tags_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?;
        let custom_fields = serde_json::from_str(&custom_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?;

        Ok(Contact {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            phone: row.get(2)?,
            email: row.get(3)?,
            company: row.get(4)?,
            position: row.get(5)?,
            address: row.get(6)?,
            birthday: row.get(7)?,
            notes: row.get(8)?,
            tags,
            custom_fields,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }
}

#[async_trait]
impl ContactRepository for SqliteContactRepository {
    async fn get_all(&self) -> RepositoryResult<Vec<Contact>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM contacts ORDER BY created_at ASC, rowid ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let contacts = stmt
            .query_map([], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(contacts)
    }

    async fn get_by_id(&self, contact_id: &str) -> RepositoryResult<Option<Contact>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM contacts WHERE contact_id = ?1", SELECT_COLUMNS);

        let contact = conn
            .query_row(&sql, params![contact_id], Self::map_row)
            .optional()?;
        Ok(contact)
    }

    async fn insert(&self, contact: &Contact) -> RepositoryResult<String> {
        let contact_id = contact
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let tags_json = serde_json::to_string(&contact.tags)?;
        let custom_json = serde_json::to_string(&contact.custom_fields)?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO contacts (
                contact_id, name, phone, email, company, position, address, birthday, notes,
                tags_json, custom_fields_json, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                contact_id,
                contact.name,
                contact.phone,
                contact.email,
                contact.company,
                contact.position,
                contact.address,
                contact.birthday,
                contact.notes,
                tags_json,
                custom_json,
                contact.created_at,
                contact.updated_at,
            ],
        )?;

        tracing::debug!(contact_id = %contact_id, "联系人已插入");
        Ok(contact_id)
    }

    async fn update(&self, contact: &Contact) -> RepositoryResult<()> {
        let contact_id = contact.id.clone().ok_or_else(|| RepositoryError::NotFound {
            entity: "Contact".to_string(),
            id: "<none>".to_string(),
        })?;
        let tags_json = serde_json::to_string(&contact.tags)?;
        let custom_json = serde_json::to_string(&contact.custom_fields)?;

        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE contacts SET
                name = ?2, phone = ?3, email = ?4, company = ?5, position = ?6,
                address = ?7, birthday = ?8, notes = ?9,
                tags_json = ?10, custom_fields_json = ?11, updated_at = ?12
            WHERE contact_id = ?1
            "#,
            params![
                contact_id,
                contact.name,
                contact.phone,
                contact.email,
                contact.company,
                contact.position,
                contact.address,
                contact.birthday,
                contact.notes,
                tags_json,
                custom_json,
                Utc::now(),
            ],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Contact".to_string(),
                id: contact_id,
            });
        }
        Ok(())
    }

    async fn find_by_phone_or_email(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> RepositoryResult<Vec<Contact>> {
        let phone = phone.map(str::trim).filter(|p| !p.is_empty());
        let email = email.map(str::trim).filter(|e| !e.is_empty());
        if phone.is_none() && email.is_none() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM contacts
            WHERE (?1 IS NOT NULL AND phone = ?1)
               OR (?2 IS NOT NULL AND LOWER(email) = LOWER(?2))
            ORDER BY created_at ASC, rowid ASC
            "#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let contacts = stmt
            .query_map(params![phone, email], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(contacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};

    fn setup_repo() -> SqliteContactRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        SqliteContactRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_insert_assigns_uuid_and_roundtrips_json_fields() {
        let repo = setup_repo();
        let mut contact = Contact::new("张三").with_phone("13812345678");
        contact.tags = vec!["客户".to_string(), "VIP".to_string()];
        contact
            .custom_fields
            .insert("微信".to_string(), "zhangsan_wx".to_string());

        let id = repo.insert(&contact).await.unwrap();
        assert!(Uuid::parse_str(&id).is_ok());

        let loaded = repo.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(loaded.id.as_deref(), Some(id.as_str()));
        assert_eq!(loaded.name, "张三");
        assert_eq!(loaded.tags, contact.tags);
        assert_eq!(loaded.custom_fields, contact.custom_fields);
        assert!(loaded.email.is_none());
    }

    #[tokio::test]
    async fn test_insert_keeps_explicit_id() {
        let repo = setup_repo();
        let mut contact = Contact::new("李四");
        contact.id = Some("c-fixed".to_string());

        assert_eq!(repo.insert(&contact).await.unwrap(), "c-fixed");
        assert!(repo.insert(&contact).await.is_err());
    }

    #[tokio::test]
    async fn test_update_stamps_updated_at() {
        let repo = setup_repo();
        let id = repo.insert(&Contact::new("王五")).await.unwrap();
        let before = repo.get_by_id(&id).await.unwrap().unwrap();

        let mut changed = before.clone();
        changed.company = Some("星河科技".to_string());
        repo.update(&changed).await.unwrap();

        let after = repo.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(after.company.as_deref(), Some("星河科技"));
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_contact_is_not_found() {
        let repo = setup_repo();
        let mut ghost = Contact::new("幽灵");
        ghost.id = Some("missing".to_string());

        assert!(matches!(
            repo.update(&ghost).await,
            Err(RepositoryError::NotFound { .. })
        ));
        assert!(matches!(
            repo.update(&Contact::new("无ID")).await,
            Err(RepositoryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_find_by_phone_or_email() {
        let repo = setup_repo();
        repo.insert(&Contact::new("甲").with_phone("13800000001"))
            .await
            .unwrap();
        repo.insert(&Contact::new("乙").with_email("Yi@Example.org"))
            .await
            .unwrap();
        repo.insert(&Contact::new("丙")).await.unwrap();

        let by_phone = repo
            .find_by_phone_or_email(Some("13800000001"), None)
            .await
            .unwrap();
        assert_eq!(by_phone.len(), 1);
        assert_eq!(by_phone[0].name, "甲");

        let by_email = repo
            .find_by_phone_or_email(None, Some("yi@example.org"))
            .await
            .unwrap();
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].name, "乙");

        let both = repo
            .find_by_phone_or_email(Some("13800000001"), Some("yi@example.org"))
            .await
            .unwrap();
        assert_eq!(both.len(), 2);

        assert!(repo
            .find_by_phone_or_email(Some("  "), None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_get_all_in_insertion_order() {
        let repo = setup_repo();
        for name in ["一", "二", "三"] {
            repo.insert(&Contact::new(name)).await.unwrap();
        }

        let names: Vec<String> = repo
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["一", "二", "三"]);
    }
}
