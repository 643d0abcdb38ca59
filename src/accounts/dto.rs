use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::accounts::repo_types::{Account, Role};
use crate::accounts::services::{AccountStatistics, PagedAccounts};

/// Request body for POST /accounts.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    pub email: String,
    pub age: i32,
}

/// Request body for PUT /accounts/{id}: full replace, all fields required.
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub name: String,
    pub email: String,
    pub age: i32,
}

/// Request body for PATCH /accounts/{id}: only supplied fields change.
#[derive(Debug, Default, Deserialize)]
pub struct PatchAccountRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
}

impl PatchAccountRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.age.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub size: i64,
    pub sort: Option<String>,
}

fn default_page_size() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub keyword: String,
}

/// Client-facing projection of an account. Deliberately distinct from the
/// persistent `Account`: no credential field exists here at all.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub age: i32,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            age: account.age,
            role: account.role,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PagedAccountResponse {
    pub items: Vec<AccountResponse>,
    pub page: i64,
    pub size: i64,
    pub total_count: i64,
    pub total_pages: i64,
    pub first: bool,
    pub last: bool,
}

impl From<PagedAccounts> for PagedAccountResponse {
    fn from(paged: PagedAccounts) -> Self {
        Self {
            items: paged.items.into_iter().map(AccountResponse::from).collect(),
            page: paged.page,
            size: paged.size,
            total_count: paged.total_count,
            total_pages: paged.total_pages,
            first: paged.first,
            last: paged.last,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub total_count: i64,
    pub adult_count: i64,
    pub average_age: f64,
    pub min_age: i32,
    pub max_age: i32,
}

impl From<AccountStatistics> for StatisticsResponse {
    fn from(stats: AccountStatistics) -> Self {
        Self {
            total_count: stats.total_count,
            adult_count: stats.adult_count,
            average_age: stats.average_age,
            min_age: stats.min_age,
            max_age: stats.max_age,
        }
    }
}
