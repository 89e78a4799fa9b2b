//! `SeaORM` Entity for splits table.
//!
//! `amount` is stored in minor units of the split's currency.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "splits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub split_id: String,
    pub transaction_id: String,
    pub position: i32,
    pub split_date: Date,
    pub description: String,
    pub currency: String,
    pub amount: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::TransactionId",
        on_delete = "Cascade"
    )]
    Transactions,
    #[sea_orm(
        belongs_to = "super::currencies::Entity",
        from = "Column::Currency",
        to = "super::currencies::Column::Name"
    )]
    Currencies,
    #[sea_orm(has_many = "super::split_accounts::Entity")]
    SplitAccounts,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::currencies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Currencies.def()
    }
}

impl Related<super::split_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SplitAccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
