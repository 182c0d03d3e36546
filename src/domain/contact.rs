// ==========================================
// 通讯录导入管道 - 联系人领域模型
// ==========================================
// 职责: 标准字段枚举 / 联系人实体 / 映射后的中间记录
// 红线: 联系人 ID 只由 Contact Store 分配
// ==========================================

use crate::domain::import::FieldMapping;
use crate::domain::sheet::RawRow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// ContactField - 系统标准字段
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    Name,
    Phone,
    Email,
    Company,
    Position,
    Address,
    Birthday,
    Notes,
    Tags,
    /// 自定义字段（值为源列名）
    Custom(String),
}

impl ContactField {
    /// 全部标准字段（不含自定义），顺序即关键字字典顺序
    pub const STANDARD: [ContactField; 9] = [
        ContactField::Name,
        ContactField::Phone,
        ContactField::Email,
        ContactField::Company,
        ContactField::Position,
        ContactField::Address,
        ContactField::Birthday,
        ContactField::Notes,
        ContactField::Tags,
    ];

    /// 必须保证有映射的关键字段
    pub const CRITICAL: [ContactField; 3] =
        [ContactField::Name, ContactField::Phone, ContactField::Email];

    /// 字段键（校验规则、映射记录中使用）
    pub fn key(&self) -> String {
        match self {
            ContactField::Custom(column) => column.clone(),
            other => other.standard_key().to_string(),
        }
    }

    fn standard_key(&self) -> &'static str {
        match self {
            ContactField::Name => "name",
            ContactField::Phone => "phone",
            ContactField::Email => "email",
            ContactField::Company => "company",
            ContactField::Position => "position",
            ContactField::Address => "address",
            ContactField::Birthday => "birthday",
            ContactField::Notes => "notes",
            ContactField::Tags => "tags",
            ContactField::Custom(_) => "custom",
        }
    }

    pub fn from_key(key: &str) -> Self {
        match key {
            "name" => ContactField::Name,
            "phone" => ContactField::Phone,
            "email" => ContactField::Email,
            "company" => ContactField::Company,
            "position" => ContactField::Position,
            "address" => ContactField::Address,
            "birthday" => ContactField::Birthday,
            "notes" => ContactField::Notes,
            "tags" => ContactField::Tags,
            other => ContactField::Custom(other.to_string()),
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, ContactField::Custom(_))
    }
}

impl fmt::Display for ContactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContactField::Custom(column) => write!(f, "custom({})", column),
            other => f.write_str(other.standard_key()),
        }
    }
}

// ==========================================
// Contact - 联系人实体
// ==========================================
// 对齐: contacts 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Option<String>, // Store 分配（UUID），未落库时为 None

    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub address: Option<String>,
    pub birthday: Option<String>, // YYYY-MM-DD（无法解析时保留原文）
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub custom_fields: BTreeMap<String, String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// 创建只有姓名的新联系人
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name: name.into(),
            phone: None,
            email: None,
            company: None,
            position: None,
            address: None,
            birthday: None,
            notes: None,
            tags: Vec::new(),
            custom_fields: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    /// 取文本字段值（差异比较用）
    pub fn field_value(&self, field: &ContactField) -> Option<&str> {
        match field {
            ContactField::Name => Some(self.name.as_str()),
            ContactField::Phone => self.phone.as_deref(),
            ContactField::Email => self.email.as_deref(),
            ContactField::Company => self.company.as_deref(),
            ContactField::Position => self.position.as_deref(),
            ContactField::Address => self.address.as_deref(),
            ContactField::Birthday => self.birthday.as_deref(),
            ContactField::Notes => self.notes.as_deref(),
            ContactField::Tags => None,
            ContactField::Custom(key) => self.custom_fields.get(key).map(String::as_str),
        }
    }
}

// ==========================================
// MappedRecord - 字段映射后的中间记录
// ==========================================
// 用途: 校验器输入 / 转换为 Contact
// 生命周期: 仅在导入流程内
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappedRecord {
    pub row_index: usize,
    /// 字段键 → 值（标准字段用 name/phone/...，自定义字段用源列名）
    pub values: BTreeMap<String, String>,
}

impl MappedRecord {
    pub fn new(row_index: usize) -> Self {
        Self {
            row_index,
            values: BTreeMap::new(),
        }
    }

    /// 按字段映射投影原始行
    ///
    /// 未出现在映射中的列被忽略；多列映射到同一字段时取第一个非空值
    pub fn from_row(row: &RawRow, mappings: &[FieldMapping]) -> Self {
        let mut record = Self::new(row.row_index());
        for mapping in mappings {
            let value = row.get(&mapping.excel_column).unwrap_or("");
            let key = mapping.system_field.key();
            if record.get(&key).is_none() {
                record.set(key, value);
            }
        }
        record
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// 取值（空白视为缺失）
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    /// 全部值为空
    pub fn is_blank(&self) -> bool {
        self.values.values().all(|v| v.trim().is_empty())
    }

    /// 转换为待落库的 Contact
    ///
    /// 非标准键全部进入 custom_fields；tags 按分隔符拆分
    pub fn to_contact(&self) -> Contact {
        let mut contact = Contact::new(self.get("name").unwrap_or_default());
        let owned = |key: &str| self.get(key).map(str::to_string);

        contact.phone = owned("phone");
        contact.email = owned("email");
        contact.company = owned("company");
        contact.position = owned("position");
        contact.address = owned("address");
        contact.birthday = owned("birthday");
        contact.notes = owned("notes");
        contact.tags = self
            .get("tags")
            .map(crate::importer::data_cleaner::split_tags)
            .unwrap_or_default();

        for (key, value) in &self.values {
            if ContactField::from_key(key).is_custom() && !value.trim().is_empty() {
                contact.custom_fields.insert(key.clone(), value.clone());
            }
        }

        contact
    }
}
