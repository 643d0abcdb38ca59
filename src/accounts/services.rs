use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::info;

use crate::accounts::repo::SortSpec;
use crate::accounts::repo_types::{Account, Role};
use crate::error::ApiError;

/// Anyone this age or older counts as an adult.
pub const ADULT_AGE: i32 = 19;

const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 255;

pub(crate) fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::invalid_data("name", "must not be blank"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::invalid_data(
            "name",
            format!("must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> Result<(), ApiError> {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(ApiError::invalid_data(
            "email",
            format!("must be at most {MAX_EMAIL_LEN} characters"),
        ));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ApiError::invalid_data("email", "is not a valid address"));
    }
    Ok(())
}

pub(crate) fn validate_age(age: i32) -> Result<(), ApiError> {
    if !(0..=150).contains(&age) {
        return Err(ApiError::invalid_data("age", "must be between 0 and 150"));
    }
    Ok(())
}

/// The pre-insert duplicate check gives a friendly error; under concurrent
/// writes the unique constraint is what actually guarantees uniqueness, so
/// its violation maps to the same error.
pub(crate) fn map_unique_violation(err: sqlx::Error, email: &str) -> ApiError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return ApiError::DuplicateEmail(email.to_string());
        }
    }
    err.into()
}

pub async fn create_account(
    db: &PgPool,
    name: &str,
    email: &str,
    age: i32,
) -> Result<Account, ApiError> {
    validate_name(name)?;
    validate_email(email)?;
    validate_age(age)?;

    let mut tx = db.begin().await?;
    if Account::find_by_email(&mut *tx, email).await?.is_some() {
        return Err(ApiError::DuplicateEmail(email.to_string()));
    }
    let account = Account::insert(&mut *tx, name, email, age, "", Role::User)
        .await
        .map_err(|e| map_unique_violation(e, email))?;
    tx.commit().await?;

    info!(account_id = account.id, "account created");
    Ok(account)
}

pub async fn get_account(db: &PgPool, id: i64) -> Result<Account, ApiError> {
    Account::find_by_id(db, id)
        .await?
        .ok_or(ApiError::NotFound(id))
}

#[derive(Debug)]
pub struct PagedAccounts {
    pub items: Vec<Account>,
    pub page: i64,
    pub size: i64,
    pub total_count: i64,
    pub total_pages: i64,
    pub first: bool,
    pub last: bool,
}

pub async fn list_accounts(
    db: &PgPool,
    page: i64,
    size: i64,
    sort: Option<&str>,
) -> Result<PagedAccounts, ApiError> {
    if page < 0 {
        return Err(ApiError::invalid_data("page", "must not be negative"));
    }
    if size <= 0 {
        return Err(ApiError::invalid_data("size", "must be positive"));
    }
    let sort = match sort {
        Some(raw) => SortSpec::parse(raw)
            .ok_or_else(|| ApiError::InvalidArgument(format!("unknown sort field: {raw}")))?,
        None => SortSpec::default(),
    };

    let offset = page
        .checked_mul(size)
        .ok_or_else(|| ApiError::invalid_data("page", "is out of range"))?;

    let (items, total_count) = Account::page(db, offset, size, sort).await?;
    Ok(paginate(items, page, size, total_count))
}

fn paginate(items: Vec<Account>, page: i64, size: i64, total_count: i64) -> PagedAccounts {
    let total_pages = if total_count == 0 {
        0
    } else {
        (total_count + size - 1) / size
    };
    PagedAccounts {
        items,
        page,
        size,
        total_count,
        total_pages,
        first: page == 0,
        last: page + 1 >= total_pages,
    }
}

pub async fn search_by_name(db: &PgPool, keyword: &str) -> Result<Vec<Account>, ApiError> {
    if keyword.trim().is_empty() {
        return Err(ApiError::InvalidArgument(
            "keyword must not be blank".into(),
        ));
    }
    Ok(Account::find_by_name_containing(db, keyword).await?)
}

pub async fn update_account(
    db: &PgPool,
    id: i64,
    name: &str,
    email: &str,
    age: i32,
) -> Result<Account, ApiError> {
    validate_name(name)?;
    validate_email(email)?;
    validate_age(age)?;

    let mut tx = db.begin().await?;
    let existing = Account::find_by_id(&mut *tx, id)
        .await?
        .ok_or(ApiError::NotFound(id))?;

    if existing.email != email && Account::find_by_email(&mut *tx, email).await?.is_some() {
        return Err(ApiError::DuplicateEmail(email.to_string()));
    }

    let updated = Account::update_row(&mut *tx, id, name, email, age)
        .await
        .map_err(|e| map_unique_violation(e, email))?
        .ok_or(ApiError::NotFound(id))?;
    tx.commit().await?;

    info!(account_id = id, "account updated");
    Ok(updated)
}

/// Partial update: only the supplied fields overwrite stored values.
/// "At least one field present" is the HTTP layer's job, not this one's.
pub async fn patch_account(
    db: &PgPool,
    id: i64,
    name: Option<&str>,
    email: Option<&str>,
    age: Option<i32>,
) -> Result<Account, ApiError> {
    if let Some(name) = name {
        validate_name(name)?;
    }
    if let Some(email) = email {
        validate_email(email)?;
    }
    if let Some(age) = age {
        validate_age(age)?;
    }

    let mut tx = db.begin().await?;
    let existing = Account::find_by_id(&mut *tx, id)
        .await?
        .ok_or(ApiError::NotFound(id))?;

    if let Some(email) = email {
        if existing.email != email && Account::find_by_email(&mut *tx, email).await?.is_some() {
            return Err(ApiError::DuplicateEmail(email.to_string()));
        }
    }

    let name = name.unwrap_or(&existing.name);
    let email = email.unwrap_or(&existing.email);
    let age = age.unwrap_or(existing.age);

    let updated = Account::update_row(&mut *tx, id, name, email, age)
        .await
        .map_err(|e| map_unique_violation(e, email))?
        .ok_or(ApiError::NotFound(id))?;
    tx.commit().await?;

    info!(account_id = id, "account patched");
    Ok(updated)
}

pub async fn delete_account(db: &PgPool, id: i64) -> Result<(), ApiError> {
    let mut tx = db.begin().await?;
    if !Account::exists_by_id(&mut *tx, id).await? {
        return Err(ApiError::NotFound(id));
    }
    Account::delete_by_id(&mut *tx, id).await?;
    tx.commit().await?;

    info!(account_id = id, "account deleted");
    Ok(())
}

/// In-memory filter over the full set. Fine at teaching-project row counts;
/// a database-side predicate is the fix if this ever needs to scale.
pub async fn get_adult_accounts(db: &PgPool) -> Result<Vec<Account>, ApiError> {
    let accounts = Account::find_all(db).await?;
    Ok(accounts
        .into_iter()
        .filter(|a| a.age >= ADULT_AGE)
        .collect())
}

#[derive(Debug, PartialEq)]
pub struct AccountStatistics {
    pub total_count: i64,
    pub adult_count: i64,
    pub average_age: f64,
    pub min_age: i32,
    pub max_age: i32,
}

pub async fn get_statistics(db: &PgPool) -> Result<AccountStatistics, ApiError> {
    let accounts = Account::find_all(db).await?;
    Ok(compute_statistics(&accounts))
}

/// Aggregates in memory; an empty set yields all zeroes rather than an error.
fn compute_statistics(accounts: &[Account]) -> AccountStatistics {
    if accounts.is_empty() {
        return AccountStatistics {
            total_count: 0,
            adult_count: 0,
            average_age: 0.0,
            min_age: 0,
            max_age: 0,
        };
    }

    let total_count = accounts.len() as i64;
    let adult_count = accounts.iter().filter(|a| a.age >= ADULT_AGE).count() as i64;
    let sum: i64 = accounts.iter().map(|a| a.age as i64).sum();
    let average_age = sum as f64 / total_count as f64;
    let min_age = accounts.iter().map(|a| a.age).min().unwrap_or(0);
    let max_age = accounts.iter().map(|a| a.age).max().unwrap_or(0);

    AccountStatistics {
        total_count,
        adult_count,
        average_age,
        min_age,
        max_age,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn account(age: i32) -> Account {
        Account {
            id: age as i64,
            name: format!("person-{age}"),
            email: format!("person{age}@example.com"),
            age,
            password_hash: String::new(),
            role: Role::User,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn age_bounds_are_inclusive() {
        assert!(validate_age(0).is_ok());
        assert!(validate_age(150).is_ok());
        assert!(matches!(
            validate_age(-1),
            Err(ApiError::InvalidData { field: "age", .. })
        ));
        assert!(matches!(
            validate_age(151),
            Err(ApiError::InvalidData { field: "age", .. })
        ));
    }

    #[test]
    fn name_must_be_non_blank_and_bounded() {
        assert!(validate_name("Ada").is_ok());
        assert!(validate_name("  ").is_err());
        assert!(validate_name("").is_err());
        assert!(validate_name(&"x".repeat(100)).is_ok());
        assert!(validate_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn email_syntax_and_length() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("spaces in@example.com").is_err());

        let long_local = "x".repeat(250);
        assert!(validate_email(&format!("{long_local}@example.com")).is_err());
    }

    #[test]
    fn statistics_on_empty_set_are_all_zero() {
        let stats = compute_statistics(&[]);
        assert_eq!(
            stats,
            AccountStatistics {
                total_count: 0,
                adult_count: 0,
                average_age: 0.0,
                min_age: 0,
                max_age: 0,
            }
        );
    }

    #[test]
    fn statistics_aggregate_ages() {
        let accounts = vec![account(17), account(25), account(30)];
        let stats = compute_statistics(&accounts);
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.adult_count, 2);
        assert_eq!(stats.average_age, 24.0);
        assert_eq!(stats.min_age, 17);
        assert_eq!(stats.max_age, 30);
    }

    #[test]
    fn adult_threshold_is_nineteen() {
        let accounts = vec![account(18), account(19)];
        let adults: Vec<_> = accounts.into_iter().filter(|a| a.age >= ADULT_AGE).collect();
        assert_eq!(adults.len(), 1);
        assert_eq!(adults[0].age, 19);
    }

    #[test]
    fn pagination_of_empty_set_has_zero_pages() {
        let paged = paginate(vec![], 0, 20, 0);
        assert_eq!(paged.total_pages, 0);
        assert_eq!(paged.total_count, 0);
        assert!(paged.first);
        assert!(paged.last);
    }

    #[test]
    fn pagination_rounds_up_partial_last_page() {
        let paged = paginate(vec![], 0, 20, 21);
        assert_eq!(paged.total_pages, 2);
        assert!(paged.first);
        assert!(!paged.last);

        let paged = paginate(vec![], 1, 20, 21);
        assert!(!paged.first);
        assert!(paged.last);
    }

    #[test]
    fn pagination_exact_multiple_needs_no_extra_page() {
        let paged = paginate(vec![], 1, 20, 40);
        assert_eq!(paged.total_pages, 2);
        assert!(paged.last);
    }

    #[tokio::test]
    async fn list_rejects_page_whose_offset_overflows() {
        let state = crate::state::AppState::fake();
        let err = list_accounts(&state.db, i64::MAX, 20, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidData { field: "page", .. }));
    }
}
