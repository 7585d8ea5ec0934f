//! 跨资源共用的范围内校验

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

use crate::access::{BranchScoped, RequestContext};
use crate::errors::{CrmError, Result};
use migration::entities::crm::user;

/// 引用的记录必须与新记录在同一模块、同一分支
pub(crate) async fn ensure_reference<E: BranchScoped>(
    ctx: &RequestContext,
    branch_id: i32,
    field: &str,
    id: Option<i32>,
) -> Result<()>
where
    E::Model: Sync,
{
    let Some(id) = id else {
        return Ok(());
    };

    let count = E::find()
        .filter(E::module_column().eq(ctx.module_id))
        .filter(E::branch_column().eq(branch_id))
        .filter(E::id_column().eq(id))
        .count(&ctx.db)
        .await?;
    if count == 0 {
        return Err(CrmError::validation(format!(
            "{} {} does not exist in branch {}",
            field, id, branch_id
        )));
    }
    Ok(())
}

/// 被引用的用户必须启用，且未绑定分支或属于该分支
pub(crate) async fn ensure_user_in_branch<C: ConnectionTrait>(
    db: &C,
    field: &str,
    user_id: i32,
    branch_id: i32,
) -> Result<user::Model> {
    let found = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| {
            CrmError::validation(format!(
                "{} {} does not exist or is inactive",
                field, user_id
            ))
        })?;

    match found.branch_id {
        Some(own) if own != branch_id => Err(CrmError::validation(format!(
            "{} {} belongs to branch {}, not {}",
            field, user_id, own, branch_id
        ))),
        _ => Ok(found),
    }
}

/// 同一模块 + 分支内唯一的字段，`exclude` 为更新时的自身 id
pub(crate) async fn ensure_unique_in_branch<E: BranchScoped>(
    ctx: &RequestContext,
    branch_id: i32,
    column: E::Column,
    value: &str,
    exclude: Option<i32>,
) -> Result<()>
where
    E::Model: Sync,
{
    let mut select = E::find()
        .filter(E::module_column().eq(ctx.module_id))
        .filter(E::branch_column().eq(branch_id))
        .filter(column.eq(value));
    if let Some(id) = exclude {
        select = select.filter(E::id_column().ne(id));
    }

    if select.count(&ctx.db).await? > 0 {
        return Err(CrmError::conflict(format!(
            "{} '{}' already exists in this branch",
            E::LABEL,
            value
        )));
    }
    Ok(())
}

/// 删除前检查：仍被 `E` 的 `column` 引用时报 Conflict
pub(crate) async fn ensure_unreferenced<E: EntityTrait, C: ConnectionTrait>(
    db: &C,
    column: E::Column,
    id: i32,
    subject: &str,
    referrers: &str,
) -> Result<()>
where
    E::Model: Sync,
{
    let count = E::find().filter(column.eq(id)).count(db).await?;
    if count > 0 {
        return Err(CrmError::conflict(format!(
            "{} is still referenced by {} {}",
            subject, count, referrers
        )));
    }
    Ok(())
}
