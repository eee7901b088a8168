use serde::Serialize;
use sqlx::SqlitePool;

use crate::follows;

pub const ACCOUNT_PAGE: i64 = 200;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub is_following: bool,
}

/// Up to [`ACCOUNT_PAGE`] accounts by handle then id, handle-less ones last,
/// each flagged with whether `viewer_id` follows it.
pub async fn list_accounts(db_pool: &SqlitePool, viewer_id: &str) -> Result<Vec<AccountSummary>, sqlx::Error> {
    let rows: Vec<(String, Option<String>, Option<String>, Option<String>)> =
        sqlx::query_as("SELECT id,handle,name,image FROM accounts ORDER BY handle ASC NULLS LAST, id ASC LIMIT ?")
            .bind(ACCOUNT_PAGE)
            .fetch_all(db_pool)
            .await?;

    let following = follows::list_following_for(db_pool, viewer_id).await?;

    Ok(rows.into_iter()
        .map(|(id, username, name, image)| AccountSummary {
            is_following: following.contains(&id),
            id,
            username,
            name,
            image,
        })
        .collect())
}
