//! 分支数据隔离
//!
//! 带 `module_id` / `branch_id` 列的实体实现 `BranchScoped`，
//! 查询统一走 `scoped()`，创建时用 `resolve_branch_for_create` 注入分支。

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Select};

use super::context::RequestContext;
use crate::errors::{CrmError, Result};
use migration::entities::crm::{
    branch, category, lead, product, service, target, team, unit, vendor,
};

pub trait BranchScoped: EntityTrait {
    /// 用于错误信息，如 "Lead 7 not found"
    const LABEL: &'static str;

    fn id_column() -> Self::Column;
    fn module_column() -> Self::Column;
    fn branch_column() -> Self::Column;

    /// 当前模块 + 当前分支（上下文未选分支时不限制分支）
    fn scoped(ctx: &RequestContext) -> Select<Self> {
        let select = Self::find().filter(Self::module_column().eq(ctx.module_id));
        match ctx.branch_id {
            Some(branch_id) => select.filter(Self::branch_column().eq(branch_id)),
            None => select,
        }
    }
}

/// 范围外的记录一律报 NotFound
pub async fn find_scoped<E: BranchScoped>(id: i32, ctx: &RequestContext) -> Result<E::Model> {
    E::scoped(ctx)
        .filter(E::id_column().eq(id))
        .one(&ctx.db)
        .await?
        .ok_or_else(|| CrmError::not_found(format!("{} {} not found", E::LABEL, id)))
}

/// 新记录的分支：未指定时取上下文分支；绑定分支的用户不能写别的分支
///
/// 请求体里指定的分支必须存在且启用（请求头里的分支已在建立上下文时校验过）
pub async fn resolve_branch_for_create(
    ctx: &RequestContext,
    requested: Option<i32>,
) -> Result<i32> {
    match (ctx.user_branch, requested) {
        (Some(own), Some(requested)) if own != requested => Err(CrmError::forbidden(format!(
            "You can only create records in branch {}",
            own
        ))),
        (Some(own), _) => Ok(own),
        (None, Some(requested)) => match ctx.branch_id {
            Some(selected) if selected != requested => Err(CrmError::validation(format!(
                "branch_id {} does not match the selected branch {}",
                requested, selected
            ))),
            Some(selected) => Ok(selected),
            None => {
                let found = branch::Entity::find_by_id(requested).one(&ctx.db).await?;
                if !found.is_some_and(|b| b.is_active) {
                    return Err(CrmError::validation(format!(
                        "Branch {} does not exist or is inactive",
                        requested
                    )));
                }
                Ok(requested)
            }
        },
        (None, None) => ctx.branch_id.ok_or_else(|| {
            CrmError::validation("branch_id is required when no branch is selected")
        }),
    }
}

macro_rules! impl_branch_scoped {
    ($($module:ident => $label:literal),+ $(,)?) => {
        $(
            impl BranchScoped for $module::Entity {
                const LABEL: &'static str = $label;

                fn id_column() -> Self::Column {
                    $module::Column::Id
                }

                fn module_column() -> Self::Column {
                    $module::Column::ModuleId
                }

                fn branch_column() -> Self::Column {
                    $module::Column::BranchId
                }
            }
        )+
    };
}

impl_branch_scoped! {
    lead => "Lead",
    product => "Product",
    category => "Category",
    unit => "Unit",
    vendor => "Vendor",
    service => "Service",
    target => "Target",
    team => "Team",
}
