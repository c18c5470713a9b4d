use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use thiserror::Error;

use crate::entities::audio_records;
use crate::security::cipher::{CryptoError, EncryptionKey, open, seal};
use crate::security::digest::{content_digest, verify_digest};

/// Failures on the decrypt-and-verify read path. Integrity violations must be
/// reported distinctly from not-found and from plain database errors.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Audio record metadata; never carries ciphertext or plaintext.
#[derive(Debug, Clone)]
pub struct AudioRecord {
    pub id: i32,
    pub user_id: i32,
    pub filename: String,
    pub description: Option<String>,
    pub duration_seconds: Option<i32>,
    pub created_at: String,
    pub has_encrypted_data: bool,
}

impl From<audio_records::Model> for AudioRecord {
    fn from(model: audio_records::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            filename: model.filename,
            description: model.description,
            duration_seconds: model.duration_seconds,
            created_at: model.created_at,
            has_encrypted_data: !model.encrypted_data.is_empty(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAudioRecord {
    pub user_id: i32,
    pub filename: String,
    pub audio_data: String,
    pub description: Option<String>,
    pub duration_seconds: Option<i32>,
}

/// Partial update; a `Some` audio payload reseals and redigests together.
#[derive(Debug, Clone, Default)]
pub struct AudioRecordUpdate {
    pub audio_data: Option<String>,
    pub description: Option<String>,
}

/// Decrypted payload with its verification outcome.
#[derive(Debug)]
pub struct AudioContent {
    pub audio_data: String,
    pub integrity_verified: bool,
}

pub struct AudioRepository {
    conn: DatabaseConnection,
}

impl AudioRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Seal the payload, digest the plaintext, and persist both in one write.
    pub async fn create(&self, key: &EncryptionKey, new: NewAudioRecord) -> Result<AudioRecord> {
        let encrypted_data = seal(key, new.audio_data.as_bytes());
        let hash_verification = content_digest(new.audio_data.as_bytes());
        let now = chrono::Utc::now().to_rfc3339();

        let active = audio_records::ActiveModel {
            user_id: Set(new.user_id),
            filename: Set(new.filename),
            encrypted_data: Set(encrypted_data),
            hash_verification: Set(hash_verification),
            description: Set(new.description),
            duration_seconds: Set(new.duration_seconds),
            created_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert audio record")?;

        Ok(AudioRecord::from(model))
    }

    /// Metadata lookup; the payload stays sealed.
    pub async fn get(&self, id: i32) -> Result<Option<AudioRecord>> {
        let record = audio_records::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query audio record")?;

        Ok(record.map(AudioRecord::from))
    }

    /// Decrypt the payload and verify it against the stored digest.
    ///
    /// Returns `Ok(None)` when the record does not exist;
    /// `ContentError::Crypto(CryptoError::IntegrityViolation)` when the
    /// content decrypts but no longer matches its recorded digest.
    pub async fn content(
        &self,
        key: &EncryptionKey,
        id: i32,
    ) -> Result<Option<AudioContent>, ContentError> {
        let record = audio_records::Entity::find_by_id(id).one(&self.conn).await?;

        let Some(record) = record else {
            return Ok(None);
        };

        let plaintext = open(key, &record.encrypted_data)?;
        let audio_data =
            String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)?;

        if !verify_digest(audio_data.as_bytes(), &record.hash_verification) {
            return Err(CryptoError::IntegrityViolation.into());
        }

        Ok(Some(AudioContent {
            audio_data,
            integrity_verified: true,
        }))
    }

    /// Apply a partial update. New content regenerates ciphertext and digest
    /// in the same statement; stale-digest states cannot be produced.
    pub async fn update(
        &self,
        key: &EncryptionKey,
        id: i32,
        update: AudioRecordUpdate,
    ) -> Result<bool> {
        let record = audio_records::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query audio record for update")?;

        let Some(record) = record else {
            return Ok(false);
        };

        let mut active: audio_records::ActiveModel = record.into();

        if let Some(audio_data) = update.audio_data {
            active.encrypted_data = Set(seal(key, audio_data.as_bytes()));
            active.hash_verification = Set(content_digest(audio_data.as_bytes()));
        }
        if let Some(description) = update.description {
            active.description = Set(Some(description));
        }

        active.update(&self.conn).await?;

        Ok(true)
    }

    /// Newest-first listing for one owner; `page` is 1-indexed.
    pub async fn list_by_owner(
        &self,
        user_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<AudioRecord>, u64)> {
        let paginator = audio_records::Entity::find()
            .filter(audio_records::Column::UserId.eq(user_id))
            .order_by_desc(audio_records::Column::CreatedAt)
            .paginate(&self.conn, page_size);

        let total = paginator.num_items().await?;
        let records = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to list audio records")?;

        Ok((records.into_iter().map(AudioRecord::from).collect(), total))
    }

    pub async fn count_by_owner(&self, user_id: i32) -> Result<u64> {
        let count = audio_records::Entity::find()
            .filter(audio_records::Column::UserId.eq(user_id))
            .count(&self.conn)
            .await
            .context("Failed to count audio records")?;

        Ok(count)
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = audio_records::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete audio record")?;

        Ok(result.rows_affected > 0)
    }
}
