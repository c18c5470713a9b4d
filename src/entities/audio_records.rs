use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "audio_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning user; immutable after creation.
    pub user_id: i32,

    pub filename: String,

    /// Sealed payload in "iv:ciphertext" hex form.
    #[sea_orm(column_type = "Text")]
    pub encrypted_data: String,

    /// SHA-256 of the plaintext that produced `encrypted_data`.
    pub hash_verification: String,

    pub description: Option<String>,

    pub duration_seconds: Option<i32>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
