//! Account queries

use biophonie_common::auth::{generate_token, hash_token};
use biophonie_common::db::Account;
use biophonie_common::{Error, Result};
use sqlx::SqlitePool;

/// Create an account and return it with its API token
///
/// The token is returned once and only its digest is stored.
pub async fn create_account(pool: &SqlitePool, name: &str, admin: bool) -> Result<(Account, String)> {
    let token = generate_token();

    let result = sqlx::query("INSERT INTO accounts (name, token_hash, admin) VALUES (?, ?, ?)")
        .bind(name)
        .bind(hash_token(&token))
        .bind(admin)
        .execute(pool)
        .await?;

    let account = get_account_by_id(pool, result.last_insert_rowid()).await?;
    Ok((account, token))
}

pub async fn get_account_by_id(pool: &SqlitePool, id: i64) -> Result<Account> {
    sqlx::query_as::<_, Account>(
        "SELECT id, name, token_hash, admin, created_on FROM accounts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("account {}", id)))
}

pub async fn get_account_by_name(pool: &SqlitePool, name: &str) -> Result<Account> {
    sqlx::query_as::<_, Account>(
        "SELECT id, name, token_hash, admin, created_on FROM accounts WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("account {}", name)))
}

/// Resolve the account owning `token`, if any
pub async fn find_account_by_token(pool: &SqlitePool, token: &str) -> Result<Option<Account>> {
    let account = sqlx::query_as::<_, Account>(
        "SELECT id, name, token_hash, admin, created_on FROM accounts WHERE token_hash = ?",
    )
    .bind(hash_token(token))
    .fetch_optional(pool)
    .await?;

    Ok(account)
}

/// Grant admin rights. `false` if the account does not exist.
pub async fn make_admin(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE accounts SET admin = 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}
