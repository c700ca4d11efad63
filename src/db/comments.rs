use rusqlite::{params, Connection};

use crate::db::models::Comment;

pub fn insert(conn: &Connection, post_id: i64, author_id: i64, text: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO comments (post_id, author_id, text) VALUES (?1, ?2, ?3)",
        params![post_id, author_id, text],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Comments on a post, oldest first.
pub fn list_for_post(conn: &Connection, post_id: i64) -> rusqlite::Result<Vec<Comment>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE c.post_id = ?1 ORDER BY c.id",
        Comment::SELECT
    ))?;
    let comments = stmt
        .query_map(params![post_id], Comment::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}
