use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::{BlogPost, PostDraft};

pub fn list(conn: &Connection) -> rusqlite::Result<Vec<BlogPost>> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY p.id", BlogPost::SELECT))?;
    let posts = stmt
        .query_map([], BlogPost::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

pub fn find(conn: &Connection, id: i64) -> rusqlite::Result<Option<BlogPost>> {
    conn.query_row(
        &format!("{} WHERE p.id = ?1", BlogPost::SELECT),
        params![id],
        BlogPost::from_row,
    )
    .optional()
}

/// Returns the new post's id.
pub fn insert(
    conn: &Connection,
    draft: &PostDraft,
    author_id: i64,
    date: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO blog_posts (author_id, title, subtitle, date, body, img_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            author_id,
            draft.title,
            draft.subtitle,
            date,
            draft.body,
            draft.img_url
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite the mutable fields and reassign the author. Returns false when
/// no post has that id.
pub fn update(
    conn: &Connection,
    id: i64,
    draft: &PostDraft,
    author_id: i64,
) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE blog_posts
         SET title = ?1, subtitle = ?2, body = ?3, img_url = ?4, author_id = ?5
         WHERE id = ?6",
        params![
            draft.title,
            draft.subtitle,
            draft.body,
            draft.img_url,
            author_id,
            id
        ],
    )?;
    Ok(rows > 0)
}

/// Delete a post; its comments go with it via `ON DELETE CASCADE`.
pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM blog_posts WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}
