use sea_orm::entity::prelude::*;
use serde::Serialize;

/// 销售目标：归属于单个用户或团队（二选一）
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "targets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub module_id: i32,
    pub branch_id: i32,
    pub title: String,
    pub user_id: Option<i32>,
    pub team_id: Option<i32>,
    #[sea_orm(column_type = "Double")]
    pub target_amount: f64,
    #[sea_orm(column_type = "Double")]
    pub achieved_amount: f64,
    #[sea_orm(column_type = "Double")]
    pub progress: f64,
    pub status: String,
    pub start_date: Date,
    pub end_date: Date,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
