use crate::entities::{access_logs, prelude::*};
use anyhow::Result;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};

pub struct AccessLogRepository {
    conn: DatabaseConnection,
}

impl AccessLogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Append one entry. Entries are never updated afterwards.
    pub async fn add(
        &self,
        user_id: Option<i32>,
        action: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
        success: bool,
    ) -> Result<()> {
        let active_model = access_logs::ActiveModel {
            user_id: Set(user_id),
            action: Set(action.to_string()),
            ip_address: Set(ip_address),
            user_agent: Set(user_agent),
            success: Set(success),
            timestamp: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        AccessLogs::insert(active_model).exec(&self.conn).await?;
        Ok(())
    }

    /// Newest-first page over all entries; `page` is 1-indexed.
    pub async fn list(
        &self,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<access_logs::Model>, u64)> {
        let paginator = AccessLogs::find()
            .order_by_desc(access_logs::Column::Timestamp)
            .paginate(&self.conn, page_size);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items, total))
    }

    /// Newest-first page of one user's entries.
    pub async fn list_for_user(
        &self,
        user_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<access_logs::Model>, u64)> {
        let paginator = AccessLogs::find()
            .filter(access_logs::Column::UserId.eq(user_id))
            .order_by_desc(access_logs::Column::Timestamp)
            .paginate(&self.conn, page_size);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items, total))
    }

    /// Delete entries older than the cutoff. Timestamps are RFC 3339 UTC
    /// strings, so lexicographic comparison matches chronological order.
    pub async fn prune(&self, older_than_days: i64) -> Result<u64> {
        let cutoff = (chrono::Utc::now() - chrono::Duration::days(older_than_days)).to_rfc3339();

        let result = AccessLogs::delete_many()
            .filter(access_logs::Column::Timestamp.lt(cutoff))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected)
    }
}
