//! Ledger schema.
//!
//! Users, currencies and accounts are keyed by their natural identifiers
//! (username is unique, currency name and account code are primary keys).
//! A transaction owns its splits and each split links to one or more
//! accounts; deleting a transaction cascades through both.
//!
//! The schema is expressed with the query builder so the same migration runs
//! on SQLite and PostgreSQL.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // PART 1: REFERENCED ENTITIES
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::UserId).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Currencies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Currencies::Name)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Currencies::Decimals).integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::AccountId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AccountTags::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AccountTags::AccountId).string().not_null())
                    .col(ColumnDef::new(AccountTags::Tag).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(AccountTags::AccountId)
                            .col(AccountTags::Tag),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_account_tags_account")
                            .from(AccountTags::Table, AccountTags::AccountId)
                            .to(Accounts::Table, Accounts::AccountId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 2: TRANSACTIONS & SPLITS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::TransactionId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::Postdate).date().not_null())
                    .col(ColumnDef::new(Transactions::Brief).string().not_null())
                    .col(ColumnDef::new(Transactions::PosterUserId).uuid().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_poster")
                            .from(Transactions::Table, Transactions::PosterUserId)
                            .to(Users::Table, Users::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Splits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Splits::SplitId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Splits::TransactionId).string().not_null())
                    .col(ColumnDef::new(Splits::Position).integer().not_null())
                    .col(ColumnDef::new(Splits::SplitDate).date().not_null())
                    .col(ColumnDef::new(Splits::Description).string().not_null())
                    .col(ColumnDef::new(Splits::Currency).string().not_null())
                    .col(ColumnDef::new(Splits::Amount).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_splits_transaction")
                            .from(Splits::Table, Splits::TransactionId)
                            .to(Transactions::Table, Transactions::TransactionId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_splits_currency")
                            .from(Splits::Table, Splits::Currency)
                            .to(Currencies::Table, Currencies::Name),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SplitAccounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SplitAccounts::SplitId).string().not_null())
                    .col(ColumnDef::new(SplitAccounts::AccountId).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(SplitAccounts::SplitId)
                            .col(SplitAccounts::AccountId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_split_accounts_split")
                            .from(SplitAccounts::Table, SplitAccounts::SplitId)
                            .to(Splits::Table, Splits::SplitId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_split_accounts_account")
                            .from(SplitAccounts::Table, SplitAccounts::AccountId)
                            .to(Accounts::Table, Accounts::AccountId),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 3: INDEXES
        // ============================================================
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_splits_transaction")
                    .table(Splits::Table)
                    .col(Splits::TransactionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_split_accounts_account")
                    .table(SplitAccounts::Table)
                    .col(SplitAccounts::AccountId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            SplitAccounts::Table.into_iden(),
            Splits::Table.into_iden(),
            Transactions::Table.into_iden(),
            AccountTags::Table.into_iden(),
            Accounts::Table.into_iden(),
            Currencies::Table.into_iden(),
            Users::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    UserId,
    Username,
}

#[derive(DeriveIden)]
enum Currencies {
    Table,
    Name,
    Decimals,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    AccountId,
    Name,
}

#[derive(DeriveIden)]
enum AccountTags {
    Table,
    AccountId,
    Tag,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    TransactionId,
    Postdate,
    Brief,
    PosterUserId,
}

#[derive(DeriveIden)]
enum Splits {
    Table,
    SplitId,
    TransactionId,
    Position,
    SplitDate,
    Description,
    Currency,
    Amount,
}

#[derive(DeriveIden)]
enum SplitAccounts {
    Table,
    SplitId,
    AccountId,
}
