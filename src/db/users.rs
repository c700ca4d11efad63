use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::User;

/// Insert a user. The first user in an empty table becomes the admin; the
/// check runs inside the same statement.
pub fn insert(
    conn: &Connection,
    email: &str,
    password_hash: &str,
    name: &str,
) -> rusqlite::Result<User> {
    conn.execute(
        "INSERT INTO users (email, password_hash, name, is_admin)
         VALUES (?1, ?2, ?3, NOT EXISTS (SELECT 1 FROM users))",
        params![email, password_hash, name],
    )?;
    let id = conn.last_insert_rowid();
    find_by_id(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn find_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", User::COLUMNS),
        params![id],
        User::from_row,
    )
    .optional()
}

pub fn find_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE email = ?1", User::COLUMNS),
        params![email],
        User::from_row,
    )
    .optional()
}

pub fn count(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::is_unique_violation;
    use crate::db::{memory_pool, run_migrations};

    fn conn() -> r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager> {
        let pool = memory_pool().unwrap();
        run_migrations(&pool).unwrap();
        pool.get().unwrap()
    }

    #[test]
    fn first_user_is_admin_and_later_ones_are_not() {
        let conn = conn();
        let first = insert(&conn, "admin@x.com", "h", "Admin").unwrap();
        let second = insert(&conn, "a@x.com", "h", "A").unwrap();

        assert_eq!(first.id, 1);
        assert!(first.is_admin);
        assert_eq!(second.id, 2);
        assert!(!second.is_admin);
    }

    #[test]
    fn duplicate_email_is_a_unique_violation() {
        let conn = conn();
        insert(&conn, "a@x.com", "h", "A").unwrap();
        let err = insert(&conn, "a@x.com", "h2", "Other A").unwrap_err();
        assert!(is_unique_violation(&err));
        assert_eq!(count(&conn).unwrap(), 1);
    }

    #[test]
    fn lookups_by_email_and_id() {
        let conn = conn();
        let user = insert(&conn, "a@x.com", "hash", "A").unwrap();

        let by_email = find_by_email(&conn, "a@x.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.password_hash, "hash");
        assert!(find_by_email(&conn, "b@x.com").unwrap().is_none());
        assert!(find_by_id(&conn, 99).unwrap().is_none());
    }
}
