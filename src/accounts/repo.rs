use sqlx::{PgExecutor, PgPool};

use crate::accounts::repo_types::{Account, Role};

const COLUMNS: &str = "id, name, email, age, password_hash, role, created_at, updated_at";

/// Columns clients may sort a page by. Anything else is rejected before a
/// query is built, since the ORDER BY clause cannot be a bind parameter.
pub const SORTABLE_COLUMNS: &[&str] = &["id", "name", "email", "age", "created_at", "updated_at"];

#[derive(Debug, Clone, Copy)]
pub struct SortSpec {
    pub column: &'static str,
    pub descending: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            column: "id",
            descending: false,
        }
    }
}

impl SortSpec {
    /// Parses `"name"` or `"name,desc"` against the sortable-column whitelist.
    pub fn parse(raw: &str) -> Option<SortSpec> {
        let (column, direction) = match raw.split_once(',') {
            Some((c, d)) => (c.trim(), d.trim()),
            None => (raw.trim(), "asc"),
        };
        let column = *SORTABLE_COLUMNS.iter().find(|c| **c == column)?;
        let descending = match direction {
            "asc" => false,
            "desc" => true,
            _ => return None,
        };
        Some(SortSpec {
            column,
            descending,
        })
    }
}

impl Account {
    /// Persist a new account. `created_at`/`updated_at` are set by the insert
    /// itself; the unique constraint on email is the last line of defense
    /// against concurrent duplicate registrations.
    pub async fn insert(
        db: impl PgExecutor<'_>,
        name: &str,
        email: &str,
        age: i32,
        password_hash: &str,
        role: Role,
    ) -> sqlx::Result<Account> {
        sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (name, email, age, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(name)
        .bind(email)
        .bind(age)
        .bind(password_hash)
        .bind(role)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_id(db: impl PgExecutor<'_>, id: i64) -> sqlx::Result<Option<Account>> {
        sqlx::query_as::<_, Account>(&format!("SELECT {COLUMNS} FROM accounts WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Exact, case-sensitive email lookup.
    pub async fn find_by_email(
        db: impl PgExecutor<'_>,
        email: &str,
    ) -> sqlx::Result<Option<Account>> {
        sqlx::query_as::<_, Account>(&format!("SELECT {COLUMNS} FROM accounts WHERE email = $1"))
            .bind(email)
            .fetch_optional(db)
            .await
    }

    /// Case-sensitive substring match, storage-native order.
    pub async fn find_by_name_containing(
        db: impl PgExecutor<'_>,
        keyword: &str,
    ) -> sqlx::Result<Vec<Account>> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {COLUMNS} FROM accounts WHERE name LIKE '%' || $1 || '%'"
        ))
        .bind(keyword)
        .fetch_all(db)
        .await
    }

    pub async fn find_all(db: impl PgExecutor<'_>) -> sqlx::Result<Vec<Account>> {
        sqlx::query_as::<_, Account>(&format!("SELECT {COLUMNS} FROM accounts"))
            .fetch_all(db)
            .await
    }

    /// One page of accounts plus the total row count.
    /// `sort.column` comes from SORTABLE_COLUMNS, never from raw input.
    pub async fn page(
        db: &PgPool,
        offset: i64,
        limit: i64,
        sort: SortSpec,
    ) -> sqlx::Result<(Vec<Account>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(db)
            .await?;

        let direction = if sort.descending { "DESC" } else { "ASC" };
        let items = sqlx::query_as::<_, Account>(&format!(
            "SELECT {COLUMNS} FROM accounts ORDER BY {} {} LIMIT $1 OFFSET $2",
            sort.column, direction
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        Ok((items, total))
    }

    /// Full row rewrite of the mutable fields, refreshing `updated_at`.
    /// Returns None when no row has this id.
    pub async fn update_row(
        db: impl PgExecutor<'_>,
        id: i64,
        name: &str,
        email: &str,
        age: i32,
    ) -> sqlx::Result<Option<Account>> {
        sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts
            SET name = $2, email = $3, age = $4, updated_at = now()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(age)
        .fetch_optional(db)
        .await
    }

    /// Hard delete. Returns whether a row existed and was removed.
    pub async fn delete_by_id(db: impl PgExecutor<'_>, id: i64) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn exists_by_id(db: impl PgExecutor<'_>, id: i64) -> sqlx::Result<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE id = $1)")
            .bind(id)
            .fetch_one(db)
            .await
    }

    pub async fn count(db: impl PgExecutor<'_>) -> sqlx::Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_spec_defaults_to_ascending() {
        let sort = SortSpec::parse("name").expect("name is sortable");
        assert_eq!(sort.column, "name");
        assert!(!sort.descending);
    }

    #[test]
    fn sort_spec_parses_direction() {
        let sort = SortSpec::parse("age,desc").expect("age is sortable");
        assert_eq!(sort.column, "age");
        assert!(sort.descending);

        let sort = SortSpec::parse("created_at, asc").expect("whitespace tolerated");
        assert_eq!(sort.column, "created_at");
        assert!(!sort.descending);
    }

    #[test]
    fn sort_spec_rejects_unknown_columns_and_directions() {
        assert!(SortSpec::parse("password_hash").is_none());
        assert!(SortSpec::parse("name; DROP TABLE accounts").is_none());
        assert!(SortSpec::parse("name,sideways").is_none());
        assert!(SortSpec::parse("").is_none());
    }
}
