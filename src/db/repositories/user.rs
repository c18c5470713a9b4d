use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::users;
use crate::security::Role;
use crate::security::password::{hash_password, verify_password};

/// User data returned from the repository (without the password hash).
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: String,
    pub last_login: Option<String>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            full_name: model.full_name,
            role: model.role,
            is_active: model.is_active,
            created_at: model.created_at,
            last_login: model.last_login,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Create a user, hashing the password off the async runtime.
    pub async fn create(&self, new: NewUser, security: &SecurityConfig) -> Result<User> {
        let password = new.password;
        let security = security.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, &security))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            username: Set(new.username),
            password_hash: Set(password_hash),
            email: Set(new.email),
            full_name: Set(new.full_name),
            role: Set(new.role.as_str().to_string()),
            is_active: Set(true),
            created_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        Ok(User::from(model))
    }

    pub async fn get(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    /// Look up a user by an unexpired reset token.
    pub async fn get_by_reset_token(&self, token: &str) -> Result<Option<User>> {
        let now = chrono::Utc::now().to_rfc3339();

        let user = users::Entity::find()
            .filter(users::Column::ResetToken.eq(token))
            .filter(users::Column::ResetTokenExpiry.gt(now))
            .one(&self.conn)
            .await
            .context("Failed to query user by reset token")?;

        Ok(user.map(User::from))
    }

    /// True if the username or email is already taken.
    pub async fn exists(&self, username: &str, email: &str) -> Result<bool> {
        let count = users::Entity::find()
            .filter(
                users::Column::Username
                    .eq(username)
                    .or(users::Column::Email.eq(email)),
            )
            .count(&self.conn)
            .await
            .context("Failed to check user existence")?;

        Ok(count > 0)
    }

    pub async fn list(&self, page: u64, page_size: u64) -> Result<(Vec<User>, u64)> {
        let paginator = users::Entity::find()
            .order_by_asc(users::Column::Id)
            .paginate(&self.conn, page_size);

        let total = paginator.num_items().await?;
        let users = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to list users")?;

        Ok((users.into_iter().map(User::from).collect(), total))
    }

    /// Verify a password for a user.
    /// Argon2 verification is CPU-bound, so it runs in a blocking task.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<bool> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(false);
        };

        let password_hash = user.password_hash;
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || verify_password(&password, &password_hash))
            .await
            .context("Password verification task panicked")??;

        Ok(is_valid)
    }

    /// Verify the current password of a known user id.
    pub async fn verify_password_for_id(&self, id: i32, password: &str) -> Result<bool> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(false);
        };

        let password_hash = user.password_hash;
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || verify_password(&password, &password_hash))
            .await
            .context("Password verification task panicked")??;

        Ok(is_valid)
    }

    /// Apply a partial update. Returns false if the user does not exist.
    pub async fn update(
        &self,
        id: i32,
        update: UserUpdate,
        security: &SecurityConfig,
    ) -> Result<bool> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for update")?;

        let Some(user) = user else {
            return Ok(false);
        };

        let mut active: users::ActiveModel = user.into();

        if let Some(email) = update.email {
            active.email = Set(email);
        }
        if let Some(full_name) = update.full_name {
            active.full_name = Set(full_name);
        }
        if let Some(role) = update.role {
            active.role = Set(role.as_str().to_string());
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(password) = update.password {
            let security = security.clone();
            let hash = task::spawn_blocking(move || hash_password(&password, &security))
                .await
                .context("Password hashing task panicked")??;
            active.password_hash = Set(hash);
        }

        active.update(&self.conn).await?;

        Ok(true)
    }

    /// Replace the password hash. Returns false if the user does not exist.
    pub async fn change_password(
        &self,
        id: i32,
        new_password: &str,
        security: &SecurityConfig,
    ) -> Result<bool> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for password change")?;

        let Some(user) = user else {
            return Ok(false);
        };

        let password = new_password.to_string();
        let security = security.clone();
        let new_hash = task::spawn_blocking(move || hash_password(&password, &security))
            .await
            .context("Password hashing task panicked")??;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        active.update(&self.conn).await?;

        Ok(true)
    }

    pub async fn touch_last_login(&self, id: i32) -> Result<()> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for login timestamp")?;

        if let Some(user) = user {
            let mut active: users::ActiveModel = user.into();
            active.last_login = Set(Some(chrono::Utc::now().to_rfc3339()));
            active.update(&self.conn).await?;
        }

        Ok(())
    }

    pub async fn set_reset_token(&self, id: i32, token: &str, expiry: &str) -> Result<()> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for reset token")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let mut active: users::ActiveModel = user.into();
        active.reset_token = Set(Some(token.to_string()));
        active.reset_token_expiry = Set(Some(expiry.to_string()));
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn clear_reset_token(&self, id: i32) -> Result<()> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for reset token clear")?;

        if let Some(user) = user {
            let mut active: users::ActiveModel = user.into();
            active.reset_token = Set(None);
            active.reset_token_expiry = Set(None);
            active.update(&self.conn).await?;
        }

        Ok(())
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = users::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected > 0)
    }
}
