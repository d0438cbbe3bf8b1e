use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "shift_allocations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub shift: String,
    pub tokens_per_user: i32,
    pub allocation_month: Date,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
