//! Transaction repository: the commit coordinator and the deletion path.
//!
//! A commit validates the transaction, resolves every referenced entity,
//! then writes the header, the splits and the split/account links inside
//! one database transaction. Either all of it becomes visible or none of it.
//!
//! Referenced entities are resolved in natural-key order so two commits
//! creating the same keys always take their row locks in the same order.
//! Split and link rows are written in bounded batches to stay under the
//! bind-parameter limit of the storage engine.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait, sea_query::Query,
};
use tally_core::ledger::{
    CurrencyInput, DEFAULT_ACCOUNT_TAG, LedgerService, ReferencedEntities, TransactionInput,
    ValidationError,
};
use tally_shared::config::LedgerConfig;
use tally_shared::error::AppError;
use tally_shared::types::{from_minor_units, to_minor_units};
use tracing::{error, info, warn};

use super::registry::{self, EntityRegistry, RegistryError, is_unique_violation};
use crate::entities::{currencies, split_accounts, splits, transactions, users};

/// Rows per multi-row statement. A split row binds 7 parameters, so a batch
/// stays well below the SQLite and PostgreSQL limits.
const ROWS_PER_STATEMENT: usize = 1_000;

/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// Transaction failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A transaction with the same identifier is already stored.
    #[error("Transaction already exists: {0}")]
    DuplicateTransaction(String),

    /// A split identifier is already used by a stored transaction.
    #[error("Split already exists: {0}")]
    DuplicateSplit(String),

    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    NotFound(String),

    /// Entity registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Stored or submitted data the ledger cannot represent.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransactionError {
    /// Whether the caller may retry the same request unchanged.
    ///
    /// Only storage failures are transient; validation failures and conflicts
    /// will fail again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(_) => true,
            Self::Registry(err) => err.is_retryable(),
            Self::Validation(_)
            | Self::DuplicateTransaction(_)
            | Self::DuplicateSplit(_)
            | Self::NotFound(_)
            | Self::Internal(_) => false,
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AccountNotFound(_) | RegistryError::TagNotFound { .. } => {
                Self::NotFound(err.to_string())
            }
            RegistryError::InvalidTag | RegistryError::InvalidPrecision { .. } => {
                Self::Validation(err.to_string())
            }
            RegistryError::Database(_) => Self::Database(err.to_string()),
        }
    }
}

impl From<TransactionError> for AppError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Validation(_) => Self::Validation(err.to_string()),
            TransactionError::DuplicateTransaction(_) | TransactionError::DuplicateSplit(_) => {
                Self::Conflict(err.to_string())
            }
            TransactionError::NotFound(_) => Self::NotFound(err.to_string()),
            TransactionError::Registry(inner) => inner.into(),
            TransactionError::Database(_) => Self::Database(err.to_string()),
            TransactionError::Internal(_) => Self::Internal(err.to_string()),
        }
    }
}

/// What deleting an unknown transaction identifier does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Report `NotFound`.
    #[default]
    Strict,
    /// Succeed without changes.
    Lenient,
}

impl DeletePolicy {
    /// Selects the policy from the ledger configuration.
    #[must_use]
    pub const fn from_config(config: &LedgerConfig) -> Self {
        if config.strict_delete {
            Self::Strict
        } else {
            Self::Lenient
        }
    }
}

/// Summary of a committed transaction.
#[derive(Debug, Clone)]
pub struct CommittedTransaction {
    /// Stored transaction header.
    pub transaction: transactions::Model,
    /// Poster of the transaction.
    pub poster: users::Model,
    /// Number of splits written.
    pub split_count: usize,
}

/// A stored split with its amount restored to a decimal.
#[derive(Debug, Clone)]
pub struct SplitView {
    /// Stored split row.
    pub split: splits::Model,
    /// Amount in currency units.
    pub amount: Decimal,
    /// Codes of the linked accounts, in code order.
    pub accounts: Vec<String>,
}

/// A stored transaction with its splits in submission order.
#[derive(Debug, Clone)]
pub struct TransactionView {
    /// Stored transaction header.
    pub transaction: transactions::Model,
    /// Username of the poster.
    pub poster: String,
    /// Splits in submission order.
    pub splits: Vec<SplitView>,
}

/// Transaction repository for commit, read-back and deletion.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
    registry: EntityRegistry,
    delete_policy: DeletePolicy,
}

impl TransactionRepository {
    /// Creates a new transaction repository with the strict delete policy.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            registry: EntityRegistry::new(db.clone()),
            db,
            delete_policy: DeletePolicy::default(),
        }
    }

    /// Replaces the delete policy.
    #[must_use]
    pub const fn with_delete_policy(mut self, delete_policy: DeletePolicy) -> Self {
        self.delete_policy = delete_policy;
        self
    }

    /// The entity registry sharing this repository's connection.
    #[must_use]
    pub const fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Checks that the store answers.
    pub async fn ping(&self) -> Result<(), DbErr> {
        self.db.ping().await
    }

    /// Validates and atomically stores a transaction.
    ///
    /// Referenced users, currencies and accounts are created on first use
    /// and every referenced account is tagged `main`. Nothing is written
    /// unless the whole transaction is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Validation fails (nothing is touched)
    /// - The transaction or one of its split identifiers already exists
    /// - An amount is not representable at the stored currency precision
    /// - Database operation fails
    pub async fn commit(
        &self,
        input: &TransactionInput,
    ) -> Result<CommittedTransaction, TransactionError> {
        let refs = LedgerService::prepare(input)?;

        let txn = self.db.begin().await?;
        match persist(&txn, input, &refs).await {
            Ok(committed) => {
                txn.commit().await?;
                info!(
                    transaction_id = %input.id,
                    poster = %committed.poster.username,
                    splits = committed.split_count,
                    "Transaction committed"
                );
                Ok(committed)
            }
            Err(err) => {
                if let Err(rollback) = txn.rollback().await {
                    error!(
                        transaction_id = %input.id,
                        error = %rollback,
                        "Rollback failed"
                    );
                }
                warn!(transaction_id = %input.id, error = %err, "Transaction rolled back");
                Err(err)
            }
        }
    }

    /// Reads a stored transaction back.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no transaction has the identifier.
    pub async fn get(&self, transaction_id: &str) -> Result<TransactionView, TransactionError> {
        let txn = self.db.begin().await?;

        let transaction = transactions::Entity::find_by_id(transaction_id.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| TransactionError::NotFound(transaction_id.to_string()))?;

        let poster = users::Entity::find_by_id(transaction.poster_user_id)
            .one(&txn)
            .await?
            .map(|u| u.username)
            .unwrap_or_default();

        let split_rows = splits::Entity::find()
            .filter(splits::Column::TransactionId.eq(transaction_id))
            .order_by_asc(splits::Column::Position)
            .all(&txn)
            .await?;
        let links = split_accounts::Entity::find()
            .filter(split_accounts::Column::SplitId.in_subquery(split_ids_of(transaction_id)))
            .order_by_asc(split_accounts::Column::AccountId)
            .all(&txn)
            .await?;
        let mut accounts_by_split: HashMap<String, Vec<String>> = HashMap::new();
        for link in links {
            accounts_by_split
                .entry(link.split_id)
                .or_default()
                .push(link.account_id);
        }

        let precision: HashMap<String, u32> = currencies::Entity::find()
            .filter(
                currencies::Column::Name.in_subquery(
                    Query::select()
                        .distinct()
                        .column(splits::Column::Currency)
                        .from(splits::Entity)
                        .and_where(splits::Column::TransactionId.eq(transaction_id))
                        .to_owned(),
                ),
            )
            .all(&txn)
            .await?
            .into_iter()
            .map(|c| {
                let decimals = c.precision();
                (c.name, decimals)
            })
            .collect();

        txn.commit().await?;

        let mut views = Vec::with_capacity(split_rows.len());
        for split in split_rows {
            let decimals = precision.get(&split.currency).copied().unwrap_or_default();
            let amount = from_minor_units(split.amount, decimals).map_err(|err| {
                TransactionError::Internal(format!(
                    "split {} has an unreadable amount: {err}",
                    split.split_id
                ))
            })?;
            views.push(SplitView {
                accounts: accounts_by_split.remove(&split.split_id).unwrap_or_default(),
                amount,
                split,
            });
        }

        Ok(TransactionView {
            transaction,
            poster,
            splits: views,
        })
    }

    /// Deletes a transaction with all of its splits and account links.
    ///
    /// Users, currencies, accounts and tags are never removed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown identifier under the strict policy.
    pub async fn delete(&self, transaction_id: &str) -> Result<(), TransactionError> {
        let txn = self.db.begin().await?;

        let exists = transactions::Entity::find_by_id(transaction_id.to_string())
            .one(&txn)
            .await?
            .is_some();
        if !exists {
            txn.rollback().await?;
            return match self.delete_policy {
                DeletePolicy::Strict => Err(TransactionError::NotFound(transaction_id.to_string())),
                DeletePolicy::Lenient => {
                    info!(transaction_id, "Delete of unknown transaction ignored");
                    Ok(())
                }
            };
        }

        // Children first, so the delete does not depend on cascading keys.
        split_accounts::Entity::delete_many()
            .filter(split_accounts::Column::SplitId.in_subquery(split_ids_of(transaction_id)))
            .exec(&txn)
            .await?;
        let removed = splits::Entity::delete_many()
            .filter(splits::Column::TransactionId.eq(transaction_id))
            .exec(&txn)
            .await?;
        transactions::Entity::delete_by_id(transaction_id.to_string())
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(
            transaction_id,
            splits = removed.rows_affected,
            "Transaction deleted"
        );
        Ok(())
    }

    /// Attaches a tag to an account.
    ///
    /// # Errors
    ///
    /// See [`EntityRegistry::add_tag`].
    pub async fn add_account_tag(&self, account: &str, tag: &str) -> Result<(), TransactionError> {
        Ok(self.registry.add_tag(account, tag).await?)
    }

    /// Detaches a tag from an account.
    ///
    /// # Errors
    ///
    /// See [`EntityRegistry::remove_tag`].
    pub async fn remove_account_tag(
        &self,
        account: &str,
        tag: &str,
    ) -> Result<(), TransactionError> {
        Ok(self.registry.remove_tag(account, tag).await?)
    }
}

/// Selects the split identifiers of a stored transaction.
fn split_ids_of(transaction_id: &str) -> sea_orm::sea_query::SelectStatement {
    Query::select()
        .column(splits::Column::SplitId)
        .from(splits::Entity)
        .and_where(splits::Column::TransactionId.eq(transaction_id))
        .to_owned()
}

/// Referenced currencies and accounts sorted by natural key.
fn in_key_order(refs: &ReferencedEntities) -> (Vec<&CurrencyInput>, Vec<&str>) {
    let mut currencies: Vec<&CurrencyInput> = refs.currencies.iter().collect();
    currencies.sort_by(|a, b| a.name.cmp(&b.name));
    let mut accounts: Vec<&str> = refs.accounts.iter().map(String::as_str).collect();
    accounts.sort_unstable();
    (currencies, accounts)
}

/// Writes a validated transaction inside `txn`.
async fn persist(
    txn: &DatabaseTransaction,
    input: &TransactionInput,
    refs: &ReferencedEntities,
) -> Result<CommittedTransaction, TransactionError> {
    if transactions::Entity::find_by_id(input.id.clone())
        .one(txn)
        .await?
        .is_some()
    {
        return Err(TransactionError::DuplicateTransaction(input.id.clone()));
    }

    // Resolve referenced entities
    let poster = registry::resolve_user(txn, &refs.poster).await?;
    let (currency_refs, account_refs) = in_key_order(refs);

    let mut precision: HashMap<&str, u32> = HashMap::with_capacity(currency_refs.len());
    for currency in currency_refs {
        let stored = registry::resolve_currency(txn, currency).await?;
        precision.insert(currency.name.as_str(), stored.precision());
    }

    // Accounts created by a commit are named after their code.
    for code in account_refs {
        registry::resolve_account(txn, code, code).await?;
        registry::ensure_tag(txn, code, DEFAULT_ACCOUNT_TAG).await?;
    }

    for batch in input.splits.chunks(ROWS_PER_STATEMENT) {
        if let Some(taken) = splits::Entity::find()
            .filter(splits::Column::SplitId.is_in(batch.iter().map(|s| s.id.clone())))
            .one(txn)
            .await?
        {
            return Err(TransactionError::DuplicateSplit(taken.split_id));
        }
    }

    // Build rows; amounts are stored at the currency's stored precision
    let mut split_rows = Vec::with_capacity(input.splits.len());
    let mut link_rows = Vec::new();
    for (position, split) in input.splits.iter().enumerate() {
        let name = split.currency.name.as_str();
        let decimals = precision
            .get(name)
            .copied()
            .unwrap_or(split.currency.decimals);
        let amount = to_minor_units(split.amount, decimals)
            .map_err(|err| ValidationError::from_money(position, name, err))?;

        let order = i32::try_from(position).map_err(|_| {
            TransactionError::Internal(format!("split position {position} cannot be stored"))
        })?;
        split_rows.push(splits::ActiveModel {
            split_id: Set(split.id.clone()),
            transaction_id: Set(input.id.clone()),
            position: Set(order),
            split_date: Set(split.date),
            description: Set(split.description.clone()),
            currency: Set(split.currency.name.clone()),
            amount: Set(amount),
        });
        for account in &split.accounts {
            link_rows.push(split_accounts::ActiveModel {
                split_id: Set(split.id.clone()),
                account_id: Set(account.clone()),
            });
        }
    }

    // Insert header, splits, links
    let postdate = input.postdate.ok_or(ValidationError::MissingPostDate)?;
    let transaction = transactions::ActiveModel {
        transaction_id: Set(input.id.clone()),
        postdate: Set(postdate),
        brief: Set(input.description.clone()),
        poster_user_id: Set(poster.user_id),
    }
    .insert(txn)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            TransactionError::DuplicateTransaction(input.id.clone())
        } else {
            err.into()
        }
    })?;

    for (rows, batch) in split_rows
        .chunks(ROWS_PER_STATEMENT)
        .zip(input.splits.chunks(ROWS_PER_STATEMENT))
    {
        splits::Entity::insert_many(rows.to_vec())
            .exec_without_returning(txn)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    let ids: Vec<&str> = batch.iter().map(|s| s.id.as_str()).collect();
                    TransactionError::DuplicateSplit(ids.join(", "))
                } else {
                    err.into()
                }
            })?;
    }

    for rows in link_rows.chunks(ROWS_PER_STATEMENT) {
        split_accounts::Entity::insert_many(rows.to_vec())
            .exec_without_returning(txn)
            .await?;
    }

    Ok(CommittedTransaction {
        transaction,
        poster,
        split_count: input.splits.len(),
    })
}
