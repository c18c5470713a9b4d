use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use super::audio::ContentError;
use crate::entities::financial_data;
use crate::security::cipher::{CryptoError, EncryptionKey, open, seal};
use crate::security::digest::{content_digest, verify_digest};

/// Financial record metadata; never carries ciphertext or plaintext.
#[derive(Debug, Clone)]
pub struct FinancialRecord {
    pub id: i32,
    pub user_id: i32,
    pub data_type: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub modified_at: Option<String>,
    pub has_encrypted_content: bool,
}

impl From<financial_data::Model> for FinancialRecord {
    fn from(model: financial_data::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            data_type: model.data_type,
            notes: model.notes,
            created_at: model.created_at,
            modified_at: model.modified_at,
            has_encrypted_content: !model.encrypted_content.is_empty(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewFinancialRecord {
    pub user_id: i32,
    pub data_type: String,
    pub content: String,
    pub notes: Option<String>,
}

/// Partial update; new content reseals and redigests together, and any
/// update stamps `modified_at`.
#[derive(Debug, Clone, Default)]
pub struct FinancialRecordUpdate {
    pub content: Option<String>,
    pub notes: Option<String>,
}

/// Decrypted payload with its verification outcome.
#[derive(Debug)]
pub struct FinancialContent {
    pub content: String,
    pub integrity_verified: bool,
}

pub struct FinancialRepository {
    conn: DatabaseConnection,
}

impl FinancialRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Seal the content, digest the plaintext, and persist both in one write.
    pub async fn create(
        &self,
        key: &EncryptionKey,
        new: NewFinancialRecord,
    ) -> Result<FinancialRecord> {
        let encrypted_content = seal(key, new.content.as_bytes());
        let hash_verification = content_digest(new.content.as_bytes());
        let now = chrono::Utc::now().to_rfc3339();

        let active = financial_data::ActiveModel {
            user_id: Set(new.user_id),
            data_type: Set(new.data_type),
            encrypted_content: Set(encrypted_content),
            hash_verification: Set(hash_verification),
            notes: Set(new.notes),
            created_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert financial record")?;

        Ok(FinancialRecord::from(model))
    }

    /// Metadata lookup; the payload stays sealed.
    pub async fn get(&self, id: i32) -> Result<Option<FinancialRecord>> {
        let record = financial_data::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query financial record")?;

        Ok(record.map(FinancialRecord::from))
    }

    /// Decrypt the content and verify it against the stored digest.
    pub async fn content(
        &self,
        key: &EncryptionKey,
        id: i32,
    ) -> Result<Option<FinancialContent>, ContentError> {
        let record = financial_data::Entity::find_by_id(id)
            .one(&self.conn)
            .await?;

        let Some(record) = record else {
            return Ok(None);
        };

        let plaintext = open(key, &record.encrypted_content)?;
        let content = String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)?;

        if !verify_digest(content.as_bytes(), &record.hash_verification) {
            return Err(CryptoError::IntegrityViolation.into());
        }

        Ok(Some(FinancialContent {
            content,
            integrity_verified: true,
        }))
    }

    pub async fn update(
        &self,
        key: &EncryptionKey,
        id: i32,
        update: FinancialRecordUpdate,
    ) -> Result<bool> {
        let record = financial_data::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query financial record for update")?;

        let Some(record) = record else {
            return Ok(false);
        };

        let mut active: financial_data::ActiveModel = record.into();

        if let Some(content) = update.content {
            active.encrypted_content = Set(seal(key, content.as_bytes()));
            active.hash_verification = Set(content_digest(content.as_bytes()));
        }
        if let Some(notes) = update.notes {
            active.notes = Set(Some(notes));
        }
        active.modified_at = Set(Some(chrono::Utc::now().to_rfc3339()));

        active.update(&self.conn).await?;

        Ok(true)
    }

    /// Newest-first listing for one owner, optionally filtered by data type;
    /// `page` is 1-indexed.
    pub async fn list_by_owner(
        &self,
        user_id: i32,
        data_type: Option<&str>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<FinancialRecord>, u64)> {
        let mut query = financial_data::Entity::find()
            .filter(financial_data::Column::UserId.eq(user_id))
            .order_by_desc(financial_data::Column::CreatedAt);

        if let Some(data_type) = data_type {
            query = query.filter(financial_data::Column::DataType.eq(data_type));
        }

        let paginator = query.paginate(&self.conn, page_size);

        let total = paginator.num_items().await?;
        let records = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to list financial records")?;

        Ok((
            records.into_iter().map(FinancialRecord::from).collect(),
            total,
        ))
    }

    pub async fn count_by_owner(&self, user_id: i32, data_type: Option<&str>) -> Result<u64> {
        let mut query =
            financial_data::Entity::find().filter(financial_data::Column::UserId.eq(user_id));

        if let Some(data_type) = data_type {
            query = query.filter(financial_data::Column::DataType.eq(data_type));
        }

        let count = query
            .count(&self.conn)
            .await
            .context("Failed to count financial records")?;

        Ok(count)
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = financial_data::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete financial record")?;

        Ok(result.rows_affected > 0)
    }
}
