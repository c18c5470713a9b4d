use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    /// Argon2id password hash (PHC string, salt embedded)
    pub password_hash: String,

    #[sea_orm(unique)]
    pub email: String,

    pub full_name: String,

    /// "user" or "admin"
    pub role: String,

    /// Deactivated accounts keep their rows but fail token verification.
    pub is_active: bool,

    pub created_at: String,

    pub last_login: Option<String>,

    pub reset_token: Option<String>,

    pub reset_token_expiry: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
