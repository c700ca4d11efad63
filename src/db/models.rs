use rusqlite::Row;

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub is_admin: bool,
}

impl User {
    pub(crate) const COLUMNS: &'static str = "id, email, password_hash, name, is_admin";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            name: row.get(3)?,
            is_admin: row.get(4)?,
        })
    }
}

/// A post joined with its author's display name.
#[derive(Debug, Clone)]
pub struct BlogPost {
    pub id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub title: String,
    pub subtitle: String,
    pub date: String,
    pub body: String,
    pub img_url: String,
}

impl BlogPost {
    pub(crate) const SELECT: &'static str =
        "SELECT p.id, p.author_id, u.name, p.title, p.subtitle, p.date, p.body, p.img_url
         FROM blog_posts p JOIN users u ON u.id = p.author_id";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(BlogPost {
            id: row.get(0)?,
            author_id: row.get(1)?,
            author_name: row.get(2)?,
            title: row.get(3)?,
            subtitle: row.get(4)?,
            date: row.get(5)?,
            body: row.get(6)?,
            img_url: row.get(7)?,
        })
    }
}

/// Mutable fields of a post, as authored through the post form.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub img_url: String,
}

/// A comment joined with its author's display name and email.
#[derive(Debug, Clone)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub author_email: String,
    pub text: String,
}

impl Comment {
    pub(crate) const SELECT: &'static str =
        "SELECT c.id, c.post_id, c.author_id, u.name, u.email, c.text
         FROM comments c JOIN users u ON u.id = c.author_id";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Comment {
            id: row.get(0)?,
            post_id: row.get(1)?,
            author_id: row.get(2)?,
            author_name: row.get(3)?,
            author_email: row.get(4)?,
            text: row.get(5)?,
        })
    }

    pub fn avatar_url(&self) -> String {
        gravatar_url(&self.author_email)
    }
}

/// Gravatar image for `email`: 100px, G-rated, "retro" fallback.
pub fn gravatar_url(email: &str) -> String {
    let hash = sha256::digest(email.trim().to_lowercase());
    format!("https://www.gravatar.com/avatar/{}?s=100&d=retro&r=g", hash)
}

/// True when `err` is a UNIQUE constraint failure.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}
