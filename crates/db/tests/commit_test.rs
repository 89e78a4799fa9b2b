//! Commit coordinator tests against an in-memory ledger.
//!
//! These tests verify that:
//! - A valid transaction is stored with its splits and account links
//! - Referenced users, currencies and accounts are created once and reused
//! - Rejected transactions leave no trace, including entities they introduced

mod common;

use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};
use tally_core::ledger::ValidationError;
use tally_db::entities::{account_tags, accounts, currencies, split_accounts, splits, transactions, users};
use tally_db::{EntityRegistry, TransactionError, TransactionRepository};

use common::{date, memory_db, split, transaction, transfer};

#[tokio::test]
async fn test_commit_stores_transaction() {
    let db = memory_db().await;
    let repo = TransactionRepository::new(db.clone());

    let tx = transaction(
        "T1",
        "alice",
        vec![
            split("S1", ("USD", 2), &["1000"], dec!(100)),
            split("S2", ("USD", 2), &["2000"], dec!(-100)),
        ],
    );
    let committed = repo.commit(&tx).await.unwrap();
    assert_eq!(committed.transaction.transaction_id, "T1");
    assert_eq!(committed.transaction.postdate, date(2024, 1, 15));
    assert_eq!(committed.poster.username, "alice");
    assert_eq!(committed.split_count, 2);

    let view = repo.get("T1").await.unwrap();
    assert_eq!(view.poster, "alice");
    assert_eq!(view.transaction.brief, "transaction T1");
    assert_eq!(view.splits.len(), 2);
    assert_eq!(view.splits[0].split.split_id, "S1");
    assert_eq!(view.splits[0].amount, dec!(100));
    assert_eq!(view.splits[0].split.amount, 10_000);
    assert_eq!(view.splits[0].accounts, vec!["1000"]);
    assert_eq!(view.splits[1].split.split_id, "S2");
    assert_eq!(view.splits[1].amount, dec!(-100));
    assert_eq!(view.splits[1].accounts, vec!["2000"]);

    let registry = EntityRegistry::new(db.clone());
    let usd = registry.find_currency("USD").await.unwrap().unwrap();
    assert_eq!(usd.decimals, 2);
    for code in ["1000", "2000"] {
        let account = registry.find_account(code).await.unwrap().unwrap();
        assert_eq!(account.name, code);
        assert_eq!(registry.account_tags(code).await.unwrap(), vec!["main"]);
    }
}

#[tokio::test]
async fn test_entities_are_created_once() {
    let db = memory_db().await;
    let repo = TransactionRepository::new(db.clone());

    repo.commit(&transfer("T1", "alice", "1000", "2000", dec!(5)))
        .await
        .unwrap();
    repo.commit(&transfer("T2", "alice", "2000", "1000", dec!(7.25)))
        .await
        .unwrap();

    assert_eq!(users::Entity::find().count(&db).await.unwrap(), 1);
    assert_eq!(currencies::Entity::find().count(&db).await.unwrap(), 1);
    assert_eq!(accounts::Entity::find().count(&db).await.unwrap(), 2);
    assert_eq!(account_tags::Entity::find().count(&db).await.unwrap(), 2);
    assert_eq!(transactions::Entity::find().count(&db).await.unwrap(), 2);
    assert_eq!(splits::Entity::find().count(&db).await.unwrap(), 4);
}

#[tokio::test]
async fn test_split_links_every_account() {
    let db = memory_db().await;
    let repo = TransactionRepository::new(db.clone());

    let tx = transaction(
        "T1",
        "bob",
        vec![
            split("S1", ("EUR", 2), &["5000", "1000"], dec!(42.10)),
            split("S2", ("EUR", 2), &["2000"], dec!(-42.10)),
        ],
    );
    repo.commit(&tx).await.unwrap();

    let view = repo.get("T1").await.unwrap();
    assert_eq!(view.splits[0].accounts, vec!["1000", "5000"]);
    assert_eq!(split_accounts::Entity::find().count(&db).await.unwrap(), 3);
}

#[tokio::test]
async fn test_invalid_transaction_writes_nothing() {
    let db = memory_db().await;
    let repo = TransactionRepository::new(db.clone());

    let tx = transaction(
        "T1",
        "carol",
        vec![
            split("S1", ("USD", 2), &["1000"], dec!(100)),
            split("S2", ("USD", 2), &["2000"], dec!(-99)),
        ],
    );
    let err = repo.commit(&tx).await.unwrap_err();
    assert!(matches!(
        err,
        TransactionError::Validation(ValidationError::Unbalanced { .. })
    ));

    assert_eq!(users::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(accounts::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(transactions::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_duplicate_transaction_rejected() {
    let db = memory_db().await;
    let repo = TransactionRepository::new(db.clone());

    repo.commit(&transfer("T1", "alice", "1000", "2000", dec!(10)))
        .await
        .unwrap();

    let mut again = transfer("T1", "alice", "3000", "4000", dec!(10));
    again.splits[0].id = "X1".to_string();
    again.splits[1].id = "X2".to_string();
    let err = repo.commit(&again).await.unwrap_err();
    assert!(matches!(err, TransactionError::DuplicateTransaction(id) if id == "T1"));

    // Accounts referenced only by the rejected transaction are not created.
    let registry = EntityRegistry::new(db.clone());
    assert!(registry.find_account("3000").await.unwrap().is_none());
    assert_eq!(splits::Entity::find().count(&db).await.unwrap(), 2);
}

#[tokio::test]
async fn test_split_collision_rolls_back_everything() {
    let db = memory_db().await;
    let repo = TransactionRepository::new(db.clone());

    repo.commit(&transfer("T1", "alice", "1000", "2000", dec!(10)))
        .await
        .unwrap();

    // New transaction id, new poster and account, but reuses split id T1-1.
    let tx = transaction(
        "T2",
        "dave",
        vec![
            split("T1-1", ("GBP", 2), &["7000"], dec!(3)),
            split("T2-2", ("GBP", 2), &["2000"], dec!(-3)),
        ],
    );
    let err = repo.commit(&tx).await.unwrap_err();
    assert!(matches!(err, TransactionError::DuplicateSplit(id) if id == "T1-1"));

    let registry = EntityRegistry::new(db.clone());
    assert!(registry.find_user("dave").await.unwrap().is_none());
    assert!(registry.find_currency("GBP").await.unwrap().is_none());
    assert!(registry.find_account("7000").await.unwrap().is_none());
    assert!(matches!(
        repo.get("T2").await,
        Err(TransactionError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_stored_precision_wins() {
    let db = memory_db().await;
    let repo = TransactionRepository::new(db.clone());

    let yen = transaction(
        "T1",
        "alice",
        vec![
            split("S1", ("JPY", 0), &["1000"], dec!(500)),
            split("S2", ("JPY", 0), &["2000"], dec!(-500)),
        ],
    );
    repo.commit(&yen).await.unwrap();

    // Declares two decimals, but JPY is already stored with none.
    let fractional = transaction(
        "T2",
        "alice",
        vec![
            split("S3", ("JPY", 2), &["1000"], dec!(1.5)),
            split("S4", ("JPY", 2), &["2000"], dec!(-1.5)),
        ],
    );
    let err = repo.commit(&fractional).await.unwrap_err();
    assert!(matches!(
        err,
        TransactionError::Validation(ValidationError::PrecisionExceeded { split: 0, decimals: 0, .. })
    ));

    // A whole amount declared with two decimals is stored in yen.
    let whole = transaction(
        "T3",
        "alice",
        vec![
            split("S5", ("JPY", 2), &["1000"], dec!(20.00)),
            split("S6", ("JPY", 2), &["2000"], dec!(-20.00)),
        ],
    );
    repo.commit(&whole).await.unwrap();
    let view = repo.get("T3").await.unwrap();
    assert_eq!(view.splits[0].split.amount, 20);
    assert_eq!(view.splits[0].amount, dec!(20));

    let registry = EntityRegistry::new(db);
    assert_eq!(
        registry.find_currency("JPY").await.unwrap().unwrap().decimals,
        0
    );
}

#[tokio::test]
async fn test_get_unknown_transaction() {
    let repo = TransactionRepository::new(memory_db().await);
    assert!(matches!(
        repo.get("missing").await,
        Err(TransactionError::NotFound(id)) if id == "missing"
    ));
}

fn many_splits(prefix: &str, pairs: usize) -> Vec<tally_core::ledger::SplitInput> {
    (0..pairs)
        .flat_map(|i| {
            [
                split(&format!("{prefix}-{i}-d"), ("USD", 2), &["1000", "1100"], dec!(1.25)),
                split(&format!("{prefix}-{i}-c"), ("USD", 2), &["2000", "2100"], dec!(-1.25)),
            ]
        })
        .collect()
}

#[tokio::test]
async fn test_large_transaction_round_trip() {
    let db = memory_db().await;
    let repo = TransactionRepository::new(db.clone());

    let big = transaction("BIG", "alice", many_splits("B", 2_501));
    let committed = repo.commit(&big).await.unwrap();
    assert_eq!(committed.split_count, 5_002);
    assert_eq!(splits::Entity::find().count(&db).await.unwrap(), 5_002);
    assert_eq!(split_accounts::Entity::find().count(&db).await.unwrap(), 10_004);

    let view = repo.get("BIG").await.unwrap();
    assert_eq!(view.splits.len(), 5_002);
    assert_eq!(view.splits[4_999].split.split_id, "B-2499-c");
    assert_eq!(view.splits[4_999].amount, dec!(-1.25));
    assert_eq!(view.splits[4_999].accounts, vec!["2000", "2100"]);

    // Reuses one split id far into the batch; nothing from it is kept.
    let mut clash = many_splits("C", 2_501);
    clash[4_200].id = "B-17-d".to_string();
    let err = repo
        .commit(&transaction("CLASH", "bob", clash))
        .await
        .unwrap_err();
    assert!(matches!(err, TransactionError::DuplicateSplit(ref id) if id == "B-17-d"));
    assert!(!err.is_retryable());
    assert_eq!(splits::Entity::find().count(&db).await.unwrap(), 5_002);

    repo.delete("BIG").await.unwrap();
    assert_eq!(splits::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(split_accounts::Entity::find().count(&db).await.unwrap(), 0);
}
