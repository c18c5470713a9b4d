use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::entities::access_logs;
use crate::security::EncryptionKey;

pub mod migrator;
pub mod repositories;

pub use repositories::audio::{
    AudioContent, AudioRecord, AudioRecordUpdate, ContentError, NewAudioRecord,
};
pub use repositories::financial::{
    FinancialContent, FinancialRecord, FinancialRecordUpdate, NewFinancialRecord,
};
pub use repositories::user::{NewUser, User, UserUpdate};

pub use access_logs::Model as AccessLogEntry;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn audio_repo(&self) -> repositories::audio::AudioRepository {
        repositories::audio::AudioRepository::new(self.conn.clone())
    }

    fn financial_repo(&self) -> repositories::financial::FinancialRepository {
        repositories::financial::FinancialRepository::new(self.conn.clone())
    }

    fn access_log_repo(&self) -> repositories::access_log::AccessLogRepository {
        repositories::access_log::AccessLogRepository::new(self.conn.clone())
    }

    // ---- users ----

    pub async fn create_user(&self, new: NewUser, security: &SecurityConfig) -> Result<User> {
        self.user_repo().create(new, security).await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_reset_token(&self, token: &str) -> Result<Option<User>> {
        self.user_repo().get_by_reset_token(token).await
    }

    pub async fn user_exists(&self, username: &str, email: &str) -> Result<bool> {
        self.user_repo().exists(username, email).await
    }

    pub async fn list_users(&self, page: u64, page_size: u64) -> Result<(Vec<User>, u64)> {
        self.user_repo().list(page, page_size).await
    }

    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_credentials(username, password).await
    }

    pub async fn verify_password_for_id(&self, id: i32, password: &str) -> Result<bool> {
        self.user_repo().verify_password_for_id(id, password).await
    }

    pub async fn update_user(
        &self,
        id: i32,
        update: UserUpdate,
        security: &SecurityConfig,
    ) -> Result<bool> {
        self.user_repo().update(id, update, security).await
    }

    pub async fn change_password(
        &self,
        id: i32,
        new_password: &str,
        security: &SecurityConfig,
    ) -> Result<bool> {
        self.user_repo()
            .change_password(id, new_password, security)
            .await
    }

    pub async fn touch_last_login(&self, id: i32) -> Result<()> {
        self.user_repo().touch_last_login(id).await
    }

    pub async fn set_reset_token(&self, id: i32, token: &str, expiry: &str) -> Result<()> {
        self.user_repo().set_reset_token(id, token, expiry).await
    }

    pub async fn clear_reset_token(&self, id: i32) -> Result<()> {
        self.user_repo().clear_reset_token(id).await
    }

    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    // ---- audio records ----

    pub async fn create_audio_record(
        &self,
        key: &EncryptionKey,
        new: NewAudioRecord,
    ) -> Result<AudioRecord> {
        self.audio_repo().create(key, new).await
    }

    pub async fn get_audio_record(&self, id: i32) -> Result<Option<AudioRecord>> {
        self.audio_repo().get(id).await
    }

    pub async fn get_audio_content(
        &self,
        key: &EncryptionKey,
        id: i32,
    ) -> Result<Option<AudioContent>, ContentError> {
        self.audio_repo().content(key, id).await
    }

    pub async fn update_audio_record(
        &self,
        key: &EncryptionKey,
        id: i32,
        update: AudioRecordUpdate,
    ) -> Result<bool> {
        self.audio_repo().update(key, id, update).await
    }

    pub async fn list_audio_by_owner(
        &self,
        user_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<AudioRecord>, u64)> {
        self.audio_repo()
            .list_by_owner(user_id, page, page_size)
            .await
    }

    pub async fn count_audio_by_owner(&self, user_id: i32) -> Result<u64> {
        self.audio_repo().count_by_owner(user_id).await
    }

    pub async fn delete_audio_record(&self, id: i32) -> Result<bool> {
        self.audio_repo().delete(id).await
    }

    // ---- financial records ----

    pub async fn create_financial_record(
        &self,
        key: &EncryptionKey,
        new: NewFinancialRecord,
    ) -> Result<FinancialRecord> {
        self.financial_repo().create(key, new).await
    }

    pub async fn get_financial_record(&self, id: i32) -> Result<Option<FinancialRecord>> {
        self.financial_repo().get(id).await
    }

    pub async fn get_financial_content(
        &self,
        key: &EncryptionKey,
        id: i32,
    ) -> Result<Option<FinancialContent>, ContentError> {
        self.financial_repo().content(key, id).await
    }

    pub async fn update_financial_record(
        &self,
        key: &EncryptionKey,
        id: i32,
        update: FinancialRecordUpdate,
    ) -> Result<bool> {
        self.financial_repo().update(key, id, update).await
    }

    pub async fn list_financial_by_owner(
        &self,
        user_id: i32,
        data_type: Option<&str>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<FinancialRecord>, u64)> {
        self.financial_repo()
            .list_by_owner(user_id, data_type, page, page_size)
            .await
    }

    pub async fn count_financial_by_owner(
        &self,
        user_id: i32,
        data_type: Option<&str>,
    ) -> Result<u64> {
        self.financial_repo().count_by_owner(user_id, data_type).await
    }

    pub async fn delete_financial_record(&self, id: i32) -> Result<bool> {
        self.financial_repo().delete(id).await
    }

    // ---- access logs ----

    pub async fn record_access(
        &self,
        user_id: Option<i32>,
        action: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
        success: bool,
    ) -> Result<()> {
        self.access_log_repo()
            .add(user_id, action, ip_address, user_agent, success)
            .await
    }

    pub async fn list_access_logs(
        &self,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<AccessLogEntry>, u64)> {
        self.access_log_repo().list(page, page_size).await
    }

    pub async fn list_access_logs_for_user(
        &self,
        user_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<AccessLogEntry>, u64)> {
        self.access_log_repo()
            .list_for_user(user_id, page, page_size)
            .await
    }

    pub async fn prune_access_logs(&self, older_than_days: i64) -> Result<u64> {
        self.access_log_repo().prune(older_than_days).await
    }
}
