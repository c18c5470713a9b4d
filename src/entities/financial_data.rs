use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "financial_data")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning user; immutable after creation.
    pub user_id: i32,

    /// Free-form category tag (e.g. "investment", "balance").
    pub data_type: String,

    /// Sealed payload in "iv:ciphertext" hex form.
    #[sea_orm(column_type = "Text")]
    pub encrypted_content: String,

    /// SHA-256 of the plaintext that produced `encrypted_content`.
    pub hash_verification: String,

    pub notes: Option<String>,

    pub created_at: String,

    pub modified_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
