//! Entity registry for users, currencies, accounts and account tags.
//!
//! Referenced entities are identified by natural keys and created on first
//! use. Every create is an insert inside a savepoint: when a concurrent
//! writer wins the unique constraint, the savepoint is rolled back and the
//! winner's row is read instead, so exactly one row per key ever exists and
//! the enclosing transaction stays usable.
//!
//! The `resolve_*` functions take any connection so they run either on their
//! own or inside the commit coordinator's transaction.

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DbErr, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use tally_core::ledger::{CurrencyInput, DEFAULT_ACCOUNT_TAG};
use tracing::{debug, info};
use uuid::Uuid;

use crate::entities::{account_tags, accounts, currencies, users};

/// Error types for registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Account does not carry the tag.
    #[error("Account {account} has no tag '{tag}'")]
    TagNotFound {
        /// Account code.
        account: String,
        /// Tag name.
        tag: String,
    },

    /// Tag name is empty.
    #[error("Tag name must not be empty")]
    InvalidTag,

    /// Currency precision cannot be stored.
    #[error("Currency {currency} declares unsupported precision {decimals}")]
    InvalidPrecision {
        /// Currency name.
        currency: String,
        /// Declared precision.
        decimals: u32,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl RegistryError {
    /// Whether the caller may retry the same request unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Returns true when the database rejected a write on a unique or primary key.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Inserts `model` inside a savepoint.
///
/// Returns `None` when the row already exists; the savepoint is rolled back
/// and the surrounding transaction is unaffected.
async fn insert_if_absent<C, A>(
    conn: &C,
    model: A,
) -> Result<Option<<A::Entity as EntityTrait>::Model>, DbErr>
where
    C: ConnectionTrait + TransactionTrait,
    A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    let savepoint = conn.begin().await?;
    match model.insert(&savepoint).await {
        Ok(row) => {
            savepoint.commit().await?;
            Ok(Some(row))
        }
        Err(err) if is_unique_violation(&err) => {
            savepoint.rollback().await?;
            Ok(None)
        }
        Err(err) => {
            savepoint.rollback().await?;
            Err(err)
        }
    }
}

/// Finds a user by username.
pub async fn find_user<C: ConnectionTrait>(
    conn: &C,
    username: &str,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .one(conn)
        .await
}

/// Returns the user with `username`, creating it on first reference.
pub async fn resolve_user<C>(conn: &C, username: &str) -> Result<users::Model, RegistryError>
where
    C: ConnectionTrait + TransactionTrait,
{
    if let Some(user) = find_user(conn, username).await? {
        return Ok(user);
    }

    let candidate = users::ActiveModel {
        user_id: Set(Uuid::now_v7()),
        username: Set(username.to_string()),
    };
    if let Some(user) = insert_if_absent(conn, candidate).await? {
        info!(username, user_id = %user.user_id, "User created");
        return Ok(user);
    }

    debug!(username, "User created concurrently, re-reading");
    find_user(conn, username)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("user {username}")).into())
}

/// Returns the currency named `currency.name`, creating it on first reference.
///
/// The precision of an existing currency is never changed.
pub async fn resolve_currency<C>(
    conn: &C,
    currency: &CurrencyInput,
) -> Result<currencies::Model, RegistryError>
where
    C: ConnectionTrait + TransactionTrait,
{
    if let Some(found) = currencies::Entity::find_by_id(currency.name.clone())
        .one(conn)
        .await?
    {
        return Ok(found);
    }

    let decimals = i32::try_from(currency.decimals).map_err(|_| RegistryError::InvalidPrecision {
        currency: currency.name.clone(),
        decimals: currency.decimals,
    })?;
    let candidate = currencies::ActiveModel {
        name: Set(currency.name.clone()),
        decimals: Set(decimals),
    };
    if let Some(created) = insert_if_absent(conn, candidate).await? {
        info!(currency = %created.name, decimals, "Currency created");
        return Ok(created);
    }

    debug!(currency = %currency.name, "Currency created concurrently, re-reading");
    currencies::Entity::find_by_id(currency.name.clone())
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("currency {}", currency.name)).into())
}

/// Returns the account with `code`, creating it as `name` on first reference.
///
/// A new account is tagged `main`. The name of an existing account is never
/// changed.
pub async fn resolve_account<C>(
    conn: &C,
    code: &str,
    name: &str,
) -> Result<accounts::Model, RegistryError>
where
    C: ConnectionTrait + TransactionTrait,
{
    if let Some(account) = accounts::Entity::find_by_id(code.to_string()).one(conn).await? {
        return Ok(account);
    }

    let candidate = accounts::ActiveModel {
        account_id: Set(code.to_string()),
        name: Set(name.to_string()),
    };
    if let Some(account) = insert_if_absent(conn, candidate).await? {
        ensure_tag(conn, code, DEFAULT_ACCOUNT_TAG).await?;
        info!(account = code, "Account created");
        return Ok(account);
    }

    debug!(account = code, "Account created concurrently, re-reading");
    accounts::Entity::find_by_id(code.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("account {code}")).into())
}

/// Attaches `tag` to an existing account. Attaching a tag twice is a no-op.
///
/// Returns whether the tag was newly attached.
pub async fn ensure_tag<C>(conn: &C, code: &str, tag: &str) -> Result<bool, RegistryError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let existing = account_tags::Entity::find_by_id((code.to_string(), tag.to_string()))
        .one(conn)
        .await?;
    if existing.is_some() {
        return Ok(false);
    }

    let candidate = account_tags::ActiveModel {
        account_id: Set(code.to_string()),
        tag: Set(tag.to_string()),
    };
    Ok(insert_if_absent(conn, candidate).await?.is_some())
}

fn normalize_tag(tag: &str) -> Result<&str, RegistryError> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(RegistryError::InvalidTag);
    }
    Ok(tag)
}

/// Registry of the entities transactions refer to.
#[derive(Debug, Clone)]
pub struct EntityRegistry {
    db: DatabaseConnection,
}

impl EntityRegistry {
    /// Creates a new entity registry.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the user with `username`, creating it if needed.
    pub async fn resolve_or_create_user(
        &self,
        username: &str,
    ) -> Result<users::Model, RegistryError> {
        resolve_user(&self.db, username).await
    }

    /// Returns the currency, creating it with the given precision if needed.
    pub async fn resolve_or_create_currency(
        &self,
        currency: &CurrencyInput,
    ) -> Result<currencies::Model, RegistryError> {
        resolve_currency(&self.db, currency).await
    }

    /// Returns the account with `code`, creating it as `name` if needed.
    pub async fn resolve_or_create_account(
        &self,
        code: &str,
        name: &str,
    ) -> Result<accounts::Model, RegistryError> {
        // The account and its `main` tag land together.
        let txn = self.db.begin().await?;
        let account = resolve_account(&txn, code, name).await?;
        txn.commit().await?;
        Ok(account)
    }

    /// Finds a user by username.
    pub async fn find_user(&self, username: &str) -> Result<Option<users::Model>, RegistryError> {
        Ok(find_user(&self.db, username).await?)
    }

    /// Finds a currency by name.
    pub async fn find_currency(
        &self,
        name: &str,
    ) -> Result<Option<currencies::Model>, RegistryError> {
        Ok(currencies::Entity::find_by_id(name.to_string())
            .one(&self.db)
            .await?)
    }

    /// Finds an account by code.
    pub async fn find_account(&self, code: &str) -> Result<Option<accounts::Model>, RegistryError> {
        Ok(accounts::Entity::find_by_id(code.to_string())
            .one(&self.db)
            .await?)
    }

    /// Lists the tags of an account in name order.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist.
    pub async fn account_tags(&self, code: &str) -> Result<Vec<String>, RegistryError> {
        if self.find_account(code).await?.is_none() {
            return Err(RegistryError::AccountNotFound(code.to_string()));
        }

        let tags = account_tags::Entity::find()
            .filter(account_tags::Column::AccountId.eq(code))
            .order_by_asc(account_tags::Column::Tag)
            .all(&self.db)
            .await?;
        Ok(tags.into_iter().map(|t| t.tag).collect())
    }

    /// Attaches `tag` to the account. Attaching an existing tag succeeds.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTag` for an empty tag and `AccountNotFound` if the
    /// account does not exist.
    pub async fn add_tag(&self, code: &str, tag: &str) -> Result<(), RegistryError> {
        let tag = normalize_tag(tag)?;

        let txn = self.db.begin().await?;
        if accounts::Entity::find_by_id(code.to_string())
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(RegistryError::AccountNotFound(code.to_string()));
        }
        let added = ensure_tag(&txn, code, tag).await?;
        txn.commit().await?;

        if added {
            info!(account = code, tag, "Tag added");
        }
        Ok(())
    }

    /// Detaches `tag` from the account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist and
    /// `TagNotFound` if it does not carry the tag.
    pub async fn remove_tag(&self, code: &str, tag: &str) -> Result<(), RegistryError> {
        let tag = normalize_tag(tag)?;

        let txn = self.db.begin().await?;
        if accounts::Entity::find_by_id(code.to_string())
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(RegistryError::AccountNotFound(code.to_string()));
        }

        let result = account_tags::Entity::delete_many()
            .filter(account_tags::Column::AccountId.eq(code))
            .filter(account_tags::Column::Tag.eq(tag))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(RegistryError::TagNotFound {
                account: code.to_string(),
                tag: tag.to_string(),
            });
        }
        txn.commit().await?;

        info!(account = code, tag, "Tag removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_shared::config::DatabaseConfig;

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("  savings ").unwrap(), "savings");
        assert!(matches!(normalize_tag("   "), Err(RegistryError::InvalidTag)));
    }

    #[test]
    fn test_is_retryable() {
        assert!(RegistryError::Database(DbErr::Custom("timeout".to_string())).is_retryable());
        assert!(!RegistryError::AccountNotFound("1000".to_string()).is_retryable());
        assert!(!RegistryError::InvalidTag.is_retryable());
    }

    #[test]
    fn test_plain_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&DbErr::Custom("boom".to_string())));
        assert!(!is_unique_violation(&DbErr::RecordNotFound("x".to_string())));
    }

    #[tokio::test]
    async fn test_conflicting_insert_keeps_transaction_usable() {
        let db = crate::open(&DatabaseConfig::in_memory()).await.unwrap();
        let txn = db.begin().await.unwrap();

        let first = accounts::ActiveModel {
            account_id: Set("1000".to_string()),
            name: Set("Cash".to_string()),
        };
        assert!(insert_if_absent(&txn, first).await.unwrap().is_some());

        let again = accounts::ActiveModel {
            account_id: Set("1000".to_string()),
            name: Set("Other".to_string()),
        };
        assert!(insert_if_absent(&txn, again).await.unwrap().is_none());

        // The outer transaction survives the rejected insert.
        let account = resolve_account(&txn, "1000", "Renamed").await.unwrap();
        assert_eq!(account.name, "Cash");
        assert!(ensure_tag(&txn, "1000", "main").await.unwrap());
        assert!(!ensure_tag(&txn, "1000", "main").await.unwrap());
        txn.commit().await.unwrap();

        let registry = EntityRegistry::new(db);
        assert_eq!(registry.account_tags("1000").await.unwrap(), vec!["main"]);
    }
}
