use serde::{Deserialize, Serialize};

use crate::db::{AccessLogEntry, AudioRecord, FinancialRecord, User};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Paginated listing; `page` is 1-indexed and `total` counts all rows for
/// the owner, not just the current page.
#[derive(Debug, Serialize)]
pub struct Paged<T> {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub records: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

const fn default_page() -> u64 {
    1
}

const fn default_limit() -> u64 {
    10
}

impl PageQuery {
    /// Clamp out-of-range values instead of rejecting the request.
    #[must_use]
    pub const fn normalized(&self) -> (u64, u64) {
        let page = if self.page == 0 { 1 } else { self.page };
        let limit = if self.limit == 0 || self.limit > 100 {
            10
        } else {
            self.limit
        };
        (page, limit)
    }
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: String,
    pub last_login: Option<String>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AudioRecordDto {
    pub id: i32,
    pub user_id: i32,
    pub filename: String,
    pub description: Option<String>,
    pub duration_seconds: Option<i32>,
    pub created_at: String,
    pub has_encrypted_data: bool,
}

impl From<AudioRecord> for AudioRecordDto {
    fn from(record: AudioRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            filename: record.filename,
            description: record.description,
            duration_seconds: record.duration_seconds,
            created_at: record.created_at,
            has_encrypted_data: record.has_encrypted_data,
        }
    }
}

/// Decrypted audio payload; only ever returned after the digest check passed.
#[derive(Debug, Serialize)]
pub struct AudioDataDto {
    pub id: i32,
    pub filename: String,
    pub audio_data: String,
    pub integrity_verified: bool,
}

#[derive(Debug, Serialize)]
pub struct FinancialRecordDto {
    pub id: i32,
    pub user_id: i32,
    pub data_type: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub modified_at: Option<String>,
    pub has_encrypted_content: bool,
}

impl From<FinancialRecord> for FinancialRecordDto {
    fn from(record: FinancialRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            data_type: record.data_type,
            notes: record.notes,
            created_at: record.created_at,
            modified_at: record.modified_at,
            has_encrypted_content: record.has_encrypted_content,
        }
    }
}

/// Decrypted financial payload; only ever returned after the digest check
/// passed.
#[derive(Debug, Serialize)]
pub struct FinancialContentDto {
    pub id: i32,
    pub data_type: String,
    pub content: String,
    pub integrity_verified: bool,
}

#[derive(Debug, Serialize)]
pub struct AccessLogDto {
    pub id: i32,
    pub user_id: Option<i32>,
    pub action: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub success: bool,
    pub timestamp: String,
}

impl From<AccessLogEntry> for AccessLogDto {
    fn from(entry: AccessLogEntry) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            action: entry.action,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            success: entry.success,
            timestamp: entry.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
