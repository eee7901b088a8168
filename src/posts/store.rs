use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::{db, error::ApiError};

pub const TITLE_MAX: usize = 140;
pub const CONTENT_MAX: usize = 2000;
/// Counted in characters of the encoded data url, not in image bytes.
pub const IMAGE_MAX: usize = 4_000_000;
pub const RECENT_POSTS: u32 = 100;

#[derive(Debug, Error)]
pub enum PostError {
    #[error("Title must be 1-140 characters.")]
    TitleInvalid,
    #[error("Content too long (max 2000 characters).")]
    BodyTooLong,
    #[error("Image too large.")]
    ImageTooLarge,
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

impl From<PostError> for ApiError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::Store(e) => ApiError::store("Failed to create post.")(e),
            _ => ApiError::InvalidInput(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub image_data_url: Option<String>,
}

impl NewPost {
    /// Checks the limits and returns the post as it will be stored: title
    /// trimmed, content untouched.
    pub fn validate(self) -> Result<NewPost, PostError> {
        let title = self.title.trim();
        let title_len = title.chars().count();
        if title_len < 1 || title_len > TITLE_MAX {
            return Err(PostError::TitleInvalid);
        }
        if self.content.trim().chars().count() > CONTENT_MAX {
            return Err(PostError::BodyTooLong);
        }
        if self.image_data_url.as_ref().is_some_and(|img| img.chars().count() > IMAGE_MAX) {
            return Err(PostError::ImageTooLarge);
        }

        Ok(NewPost {
            title: title.to_owned(),
            content: self.content,
            image_data_url: self.image_data_url.filter(|img| !img.is_empty()),
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data_url: Option<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub author: Author,
}

#[derive(FromRow)]
struct PostRow {
    id: String,
    title: String,
    content: String,
    image_data_url: Option<String>,
    created_at: i64,
    author_id: String,
    author_handle: Option<String>,
    author_name: Option<String>,
    author_image: Option<String>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            title: row.title,
            content: row.content,
            image_data_url: row.image_data_url,
            created_at: row.created_at,
            author: Author {
                id: row.author_id,
                username: row.author_handle,
                name: row.author_name,
                image: row.author_image,
            },
        }
    }
}

const SELECT_POSTS: &str = r#"SELECT p.id, p.title, p.content, p.image_data_url, p.created_at,
    a.id AS author_id, a.handle AS author_handle, a.name AS author_name, a.image AS author_image
    FROM posts p JOIN accounts a ON a.id = p.author_id"#;

/// Stores a post by `author_id`.
///
/// `created_at` is the wall clock, raised to the newest existing timestamp if
/// the clock went backwards, so timestamps never decrease in insertion order.
/// Both happen in one statement.
pub async fn create_post(db_pool: &SqlitePool, author_id: &str, post: NewPost) -> Result<Post, PostError> {
    let NewPost { title, content, image_data_url } = post.validate()?;
    let id = Uuid::now_v7().to_string();

    sqlx::query(
        r#"INSERT INTO posts (id,author_id,title,content,image_data_url,created_at)
        VALUES (?,?,?,?,?,MAX(?, COALESCE((SELECT MAX(created_at) FROM posts), 0)))"#
    )
        .bind(&id)
        .bind(author_id)
        .bind(&title)
        .bind(&content)
        .bind(&image_data_url)
        .bind(db::now_millis())
        .execute(db_pool)
        .await?;

    let row: PostRow = sqlx::query_as(&format!("{SELECT_POSTS} WHERE p.id=?"))
        .bind(&id)
        .fetch_one(db_pool)
        .await?;
    Ok(row.into())
}

/// The newest `limit` posts, newest first. Posts sharing a timestamp come
/// back in reverse insertion order.
pub async fn list_recent_posts(db_pool: &SqlitePool, limit: u32) -> Result<Vec<Post>, sqlx::Error> {
    let rows: Vec<PostRow> = sqlx::query_as(&format!("{SELECT_POSTS} ORDER BY p.created_at DESC, p.seq DESC LIMIT ?"))
        .bind(limit)
        .fetch_all(db_pool)
        .await?;
    Ok(rows.into_iter().map(Post::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(title: &str) -> NewPost {
        NewPost { title: title.to_owned(), ..Default::default() }
    }

    #[test]
    fn title_bounds() {
        assert!(post(&"t".repeat(140)).validate().is_ok());
        assert!(matches!(post(&"t".repeat(141)).validate(), Err(PostError::TitleInvalid)));
        assert!(matches!(post("   ").validate(), Err(PostError::TitleInvalid)));
        assert!(matches!(post("").validate(), Err(PostError::TitleInvalid)));
        // surrounding whitespace does not count
        assert!(post(&format!("  {}  ", "t".repeat(140))).validate().is_ok());
        // characters, not bytes
        assert!(post(&"é".repeat(140)).validate().is_ok());
        assert!(post(&"🦀".repeat(140)).validate().is_ok());
        assert!(matches!(post(&"🦀".repeat(141)).validate(), Err(PostError::TitleInvalid)));
    }

    #[test]
    fn content_bounds() {
        let ok = NewPost { content: "c".repeat(2000), ..post("t") };
        assert!(ok.validate().is_ok());

        let long = NewPost { content: "c".repeat(2001), ..post("t") };
        assert!(matches!(long.validate(), Err(PostError::BodyTooLong)));
    }

    #[test]
    fn image_bounds() {
        let ok = NewPost { image_data_url: Some("i".repeat(4_000_000)), ..post("t") };
        assert!(ok.validate().is_ok());

        let big = NewPost { image_data_url: Some("i".repeat(4_000_001)), ..post("t") };
        let err = big.validate().unwrap_err();
        assert!(matches!(err, PostError::ImageTooLarge));
        assert!(matches!(ApiError::from(err), ApiError::InvalidInput(_)));
    }

    #[test]
    fn title_is_trimmed_and_content_kept_verbatim() {
        let checked = NewPost {
            title: "  Hello \n".into(),
            content: "\n  indented\n\n".into(),
            image_data_url: Some(String::new()),
        }.validate().unwrap();
        assert_eq!(checked.title, "Hello");
        assert_eq!(checked.content, "\n  indented\n\n");
        assert_eq!(checked.image_data_url, None);
    }

    #[tokio::test]
    async fn create_returns_the_stored_post() {
        let db_pool = db::test_pool().await;
        let author = db::test_account(&db_pool, "a", Some("ada")).await;

        let created = create_post(&db_pool, &author, NewPost {
            title: " First ".into(),
            content: "body\n".into(),
            image_data_url: Some("data:image/png;base64,AAAA".into()),
        }).await.unwrap();

        assert_eq!(created.title, "First");
        assert_eq!(created.content, "body\n");
        assert_eq!(created.image_data_url.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(created.author.id, author);
        assert_eq!(created.author.username.as_deref(), Some("ada"));
        assert!(created.created_at > 0);

        let listed = list_recent_posts(&db_pool, RECENT_POSTS).await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn invalid_post_is_not_stored() {
        let db_pool = db::test_pool().await;
        let author = db::test_account(&db_pool, "a", None).await;

        assert!(create_post(&db_pool, &author, post("")).await.is_err());
        assert!(list_recent_posts(&db_pool, RECENT_POSTS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn newest_first_with_insertion_order_tiebreak() {
        let db_pool = db::test_pool().await;
        let author = db::test_account(&db_pool, "a", None).await;

        for title in ["p1", "p2", "p3"] {
            create_post(&db_pool, &author, post(title)).await.unwrap();
        }

        let titles: Vec<String> = list_recent_posts(&db_pool, RECENT_POSTS).await.unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, ["p3", "p2", "p1"]);
    }

    #[tokio::test]
    async fn timestamps_never_go_backwards() {
        let db_pool = db::test_pool().await;
        let author = db::test_account(&db_pool, "a", None).await;

        // a post stamped in the future, as if the clock had been set back since
        let future = db::now_millis() + 60_000;
        sqlx::query("INSERT INTO posts (id,author_id,title,content,created_at) VALUES ('future',?,'future','',?)")
            .bind(&author)
            .bind(future)
            .execute(&db_pool)
            .await
            .unwrap();

        let next = create_post(&db_pool, &author, post("next")).await.unwrap();
        assert_eq!(next.created_at, future);

        let titles: Vec<String> = list_recent_posts(&db_pool, RECENT_POSTS).await.unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, ["next", "future"]);
    }

    #[tokio::test]
    async fn limit_caps_the_page() {
        let db_pool = db::test_pool().await;
        let author = db::test_account(&db_pool, "a", None).await;
        for i in 0..5 {
            create_post(&db_pool, &author, post(&format!("p{i}"))).await.unwrap();
        }

        let page = list_recent_posts(&db_pool, 3).await.unwrap();
        let titles: Vec<&str> = page.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["p4", "p3", "p2"]);
    }

    #[test]
    fn post_json_shape() {
        let post = Post {
            id: "p".into(),
            title: "t".into(),
            content: "".into(),
            image_data_url: None,
            created_at: 1700000000000,
            author: Author { id: "a".into(), username: Some("ada".into()), name: None, image: None },
        };
        assert_eq!(
            serde_json::to_value(&post).unwrap(),
            serde_json::json!({
                "id": "p",
                "title": "t",
                "content": "",
                "createdAt": 1700000000000i64,
                "author": { "id": "a", "username": "ada", "name": null, "image": null },
            }),
        );
    }
}
