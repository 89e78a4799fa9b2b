//! `SeaORM` Entity for accounts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub account_id: String,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::account_tags::Entity")]
    AccountTags,
    #[sea_orm(has_many = "super::split_accounts::Entity")]
    SplitAccounts,
}

impl Related<super::account_tags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountTags.def()
    }
}

impl Related<super::split_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SplitAccounts.def()
    }
}

impl Related<super::splits::Entity> for Entity {
    fn to() -> RelationDef {
        super::split_accounts::Relation::Splits.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::split_accounts::Relation::Accounts.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
