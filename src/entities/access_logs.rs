use sea_orm::entity::prelude::*;

/// Append-only audit trail of auth-relevant events. Rows are never updated;
/// old entries may be pruned by age.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "access_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Null for events that could not be tied to an account.
    pub user_id: Option<i32>,

    /// Action tag, e.g. "LOGIN", "LOGIN_ATTEMPT", "PASSWORD_CHANGE".
    pub action: String,

    pub ip_address: Option<String>,

    pub user_agent: Option<String>,

    pub success: bool,

    pub timestamp: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
