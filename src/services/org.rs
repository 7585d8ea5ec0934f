//! 组织结构：分支、用户、业务模块

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::access::{Action, BranchScoped, RequestContext, Resource, Role};
use crate::errors::{CrmError, Result};
use crate::services::checks::ensure_unreferenced;
use crate::services::targets::refresh_for_leads;
use crate::services::teams::refresh_team_targets;
use crate::services::{Page, Pagination, double_option, fetch_page, like_pattern};
use crate::utils::password::hash_new_password;
use crate::utils::validation;
use migration::entities::crm::{
    branch, category, lead, module, product, role, service, target, team, team_member, unit, user,
    vendor,
};

// ============ Branches ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BranchQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBranch {
    pub name: String,
    pub code: String,
    pub address: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBranch {
    pub name: Option<String>,
    pub code: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,
    pub is_active: Option<bool>,
}

pub async fn list_branches(
    ctx: &RequestContext,
    query: BranchQuery,
) -> Result<Page<branch::Model>> {
    ctx.authorize(Resource::Branches, Action::View)?;

    let mut select = branch::Entity::find();
    // 绑定分支的用户只能看到自己的分支
    if let Some(own) = ctx.user_branch {
        select = select.filter(branch::Column::Id.eq(own));
    }
    if let Some(pattern) = like_pattern(query.search.as_deref()) {
        select = select.filter(
            Condition::any()
                .add(branch::Column::Name.like(pattern.clone()))
                .add(branch::Column::Code.like(pattern)),
        );
    }
    if let Some(is_active) = query.is_active {
        select = select.filter(branch::Column::IsActive.eq(is_active));
    }

    fetch_page(
        select.order_by_desc(branch::Column::CreatedAt),
        &ctx.db,
        Pagination::new(query.page, query.page_size),
    )
    .await
}

pub async fn get_branch(ctx: &RequestContext, id: i32) -> Result<branch::Model> {
    ctx.authorize(Resource::Branches, Action::View)?;

    if ctx.user_branch.is_some_and(|own| own != id) {
        return Err(CrmError::not_found(format!("Branch {} not found", id)));
    }
    find_branch(ctx, id).await
}

pub async fn create_branch(ctx: &RequestContext, input: CreateBranch) -> Result<branch::Model> {
    ctx.authorize(Resource::Branches, Action::Create)?;

    let code = normalize_code(&input.code)?;
    ensure_code_free(ctx, &code, None).await?;

    let now = Utc::now();
    let created = branch::ActiveModel {
        name: Set(validation::required_text("name", &input.name, 120)?),
        code: Set(code),
        address: Set(validation::optional_text(
            "address",
            input.address.as_deref(),
            500,
        )?),
        is_active: Set(input.is_active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&ctx.db)
    .await?;

    info!("Branch {} ({}) created", created.id, created.code);
    Ok(created)
}

pub async fn update_branch(
    ctx: &RequestContext,
    id: i32,
    input: UpdateBranch,
) -> Result<branch::Model> {
    ctx.authorize(Resource::Branches, Action::Update)?;

    let mut model = find_branch(ctx, id).await?.into_active_model();
    if let Some(name) = input.name {
        model.name = Set(validation::required_text("name", &name, 120)?);
    }
    if let Some(code) = input.code {
        let code = normalize_code(&code)?;
        ensure_code_free(ctx, &code, Some(id)).await?;
        model.code = Set(code);
    }
    if let Some(address) = input.address {
        model.address = Set(validation::optional_text("address", address.as_deref(), 500)?);
    }
    if let Some(is_active) = input.is_active {
        model.is_active = Set(is_active);
    }

    model.updated_at = Set(Utc::now());
    Ok(model.update(&ctx.db).await?)
}

/// 分支下仍有任何记录时不能删除，改为停用
pub async fn delete_branch(ctx: &RequestContext, id: i32) -> Result<()> {
    ctx.authorize(Resource::Branches, Action::Delete)?;

    let existing = find_branch(ctx, id).await?;
    let db = &ctx.db;
    let counts = [
        (
            "users",
            user::Entity::find()
                .filter(user::Column::BranchId.eq(id))
                .count(db)
                .await?,
        ),
        ("leads", rows_in_branch::<lead::Entity>(db, id).await?),
        ("teams", rows_in_branch::<team::Entity>(db, id).await?),
        ("targets", rows_in_branch::<target::Entity>(db, id).await?),
        ("products", rows_in_branch::<product::Entity>(db, id).await?),
        ("services", rows_in_branch::<service::Entity>(db, id).await?),
        ("categories", rows_in_branch::<category::Entity>(db, id).await?),
        ("units", rows_in_branch::<unit::Entity>(db, id).await?),
        ("vendors", rows_in_branch::<vendor::Entity>(db, id).await?),
    ];
    let in_use: Vec<String> = counts
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(what, count)| format!("{} {}", count, what))
        .collect();
    if !in_use.is_empty() {
        return Err(CrmError::conflict(format!(
            "Branch {} still has {}, deactivate it instead",
            id,
            in_use.join(", ")
        )));
    }

    existing.delete(db).await?;
    info!("Branch {} deleted by user {}", id, ctx.user_id);
    Ok(())
}

async fn rows_in_branch<E: BranchScoped>(db: &DatabaseConnection, id: i32) -> Result<u64>
where
    E::Model: Sync,
{
    Ok(E::find().filter(E::branch_column().eq(id)).count(db).await?)
}

async fn find_branch(ctx: &RequestContext, id: i32) -> Result<branch::Model> {
    branch::Entity::find_by_id(id)
        .one(&ctx.db)
        .await?
        .ok_or_else(|| CrmError::not_found(format!("Branch {} not found", id)))
}

fn normalize_code(raw: &str) -> Result<String> {
    let code = validation::required_text("code", raw, 16)?.to_ascii_uppercase();
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CrmError::validation(
            "code may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(code)
}

async fn ensure_code_free(ctx: &RequestContext, code: &str, exclude: Option<i32>) -> Result<()> {
    let mut select = branch::Entity::find().filter(branch::Column::Code.eq(code));
    if let Some(id) = exclude {
        select = select.filter(branch::Column::Id.ne(id));
    }
    if select.count(&ctx.db).await? > 0 {
        return Err(CrmError::conflict(format!(
            "Branch code '{}' is already in use",
            code
        )));
    }
    Ok(())
}

// ============ Users ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub search: Option<String>,
    pub role: Option<Role>,
    pub branch_id: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub branch_id: Option<i32>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "double_option")]
    pub branch_id: Option<Option<i32>>,
    pub is_active: Option<bool>,
}

/// 对外的用户信息（不含密码哈希）
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    pub branch_id: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserView {
    pub fn new(user: user::Model, role: impl Into<String>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: role.into(),
            branch_id: user.branch_id,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

pub async fn list_users(ctx: &RequestContext, query: UserQuery) -> Result<Page<UserView>> {
    ctx.authorize(Resource::Users, Action::View)?;

    let roles = role_names(&ctx.db).await?;
    let mut select = user::Entity::find();
    if let Some(own) = ctx.user_branch {
        select = select.filter(user::Column::BranchId.eq(own));
    } else if let Some(branch_id) = query.branch_id {
        select = select.filter(user::Column::BranchId.eq(branch_id));
    }
    if let Some(pattern) = like_pattern(query.search.as_deref()) {
        select = select.filter(
            Condition::any()
                .add(user::Column::Name.like(pattern.clone()))
                .add(user::Column::Email.like(pattern)),
        );
    }
    if let Some(role) = query.role {
        let role_id = roles
            .iter()
            .find_map(|(id, name)| (name == role.as_ref()).then_some(*id))
            .unwrap_or(-1);
        select = select.filter(user::Column::RoleId.eq(role_id));
    }
    if let Some(is_active) = query.is_active {
        select = select.filter(user::Column::IsActive.eq(is_active));
    }

    let page = fetch_page(
        select.order_by_desc(user::Column::CreatedAt),
        &ctx.db,
        Pagination::new(query.page, query.page_size),
    )
    .await?;
    Ok(page.map(|u| view(u, &roles)))
}

pub async fn get_user(ctx: &RequestContext, id: i32) -> Result<UserView> {
    ctx.authorize(Resource::Users, Action::View)?;

    let found = find_user(ctx, id).await?;
    let roles = role_names(&ctx.db).await?;
    Ok(view(found, &roles))
}

/// 当前登录用户的资料（`/auth/me`）
pub async fn current_user(ctx: &RequestContext) -> Result<UserView> {
    let found = user::Entity::find_by_id(ctx.user_id)
        .one(&ctx.db)
        .await?
        .ok_or_else(|| CrmError::unauthorized("User no longer exists"))?;
    Ok(UserView::new(found, ctx.role.as_ref()))
}

pub async fn create_user(ctx: &RequestContext, input: CreateUser) -> Result<UserView> {
    ctx.authorize(Resource::Users, Action::Create)?;

    let name = validation::required_text("name", &input.name, 120)?;
    let email = validation::email("email", &input.email)?;
    let password_hash = hash_new_password(&input.password)?;
    ensure_email_free(ctx, &email, None).await?;
    let role_id = role_id(&ctx.db, input.role).await?;
    check_branch(ctx, input.branch_id).await?;

    let now = Utc::now();
    let created = user::ActiveModel {
        name: Set(name),
        email: Set(email),
        password_hash: Set(password_hash),
        role_id: Set(role_id),
        branch_id: Set(input.branch_id),
        is_active: Set(input.is_active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&ctx.db)
    .await?;

    info!(
        "User {} <{}> created with role {}",
        created.id, created.email, input.role
    );
    Ok(UserView::new(created, input.role.as_ref()))
}

pub async fn update_user(ctx: &RequestContext, id: i32, input: UpdateUser) -> Result<UserView> {
    ctx.authorize(Resource::Users, Action::Update)?;

    let existing = find_user(ctx, id).await?;
    let mut model = existing.into_active_model();

    if let Some(name) = input.name {
        model.name = Set(validation::required_text("name", &name, 120)?);
    }
    if let Some(email) = input.email {
        let email = validation::email("email", &email)?;
        ensure_email_free(ctx, &email, Some(id)).await?;
        model.email = Set(email);
    }
    if let Some(password) = input.password {
        model.password_hash = Set(hash_new_password(&password)?);
    }
    if let Some(role) = input.role {
        if id == ctx.user_id && role != Role::Admin {
            return Err(CrmError::validation("You cannot change your own role"));
        }
        model.role_id = Set(role_id(&ctx.db, role).await?);
    }
    if let Some(branch_id) = input.branch_id {
        check_branch(ctx, branch_id).await?;
        model.branch_id = Set(branch_id);
    }
    if let Some(is_active) = input.is_active {
        if id == ctx.user_id && !is_active {
            return Err(CrmError::validation("You cannot deactivate yourself"));
        }
        model.is_active = Set(is_active);
    }

    model.updated_at = Set(Utc::now());
    let updated = model.update(&ctx.db).await?;
    let roles = role_names(&ctx.db).await?;
    Ok(view(updated, &roles))
}

/// 删除用户：其线索变为未分配，团队成员关系和负责人身份一并移除，相关目标重算。
/// 仍有个人目标时返回 Conflict
pub async fn delete_user(ctx: &RequestContext, id: i32) -> Result<()> {
    ctx.authorize(Resource::Users, Action::Delete)?;

    if id == ctx.user_id {
        return Err(CrmError::validation("You cannot delete yourself"));
    }
    let existing = find_user(ctx, id).await?;

    let txn = ctx.db.begin().await?;
    ensure_unreferenced::<target::Entity, _>(
        &txn,
        target::Column::UserId,
        id,
        &format!("User {}", id),
        "targets",
    )
    .await?;

    // 先记下快照和所在团队，写完后重算目标进度
    let snapshots = lead::Entity::find()
        .filter(lead::Column::AssignedTo.eq(id))
        .all(&txn)
        .await?;
    let team_ids: Vec<i32> = team_member::Entity::find()
        .select_only()
        .column(team_member::Column::TeamId)
        .filter(team_member::Column::UserId.eq(id))
        .into_tuple()
        .all(&txn)
        .await?;

    let unassigned = lead::Entity::update_many()
        .col_expr(lead::Column::AssignedTo, Expr::value(Option::<i32>::None))
        .filter(lead::Column::AssignedTo.eq(id))
        .exec(&txn)
        .await?;
    team_member::Entity::delete_many()
        .filter(team_member::Column::UserId.eq(id))
        .exec(&txn)
        .await?;
    team::Entity::update_many()
        .col_expr(team::Column::LeaderId, Expr::value(Option::<i32>::None))
        .filter(team::Column::LeaderId.eq(id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;

    refresh_for_leads(&txn, &snapshots.iter().collect::<Vec<_>>()).await?;
    for team_id in team_ids {
        refresh_team_targets(&txn, team_id).await?;
    }
    txn.commit().await?;

    if unassigned.rows_affected > 0 {
        warn!(
            "User {} deleted, {} leads are now unassigned",
            id, unassigned.rows_affected
        );
    } else {
        info!("User {} deleted", id);
    }
    Ok(())
}

async fn find_user(ctx: &RequestContext, id: i32) -> Result<user::Model> {
    let found = user::Entity::find_by_id(id)
        .one(&ctx.db)
        .await?
        .filter(|u| ctx.user_branch.is_none() || u.branch_id == ctx.user_branch);
    found.ok_or_else(|| CrmError::not_found(format!("User {} not found", id)))
}

async fn ensure_email_free(ctx: &RequestContext, email: &str, exclude: Option<i32>) -> Result<()> {
    let mut select = user::Entity::find().filter(user::Column::Email.eq(email));
    if let Some(id) = exclude {
        select = select.filter(user::Column::Id.ne(id));
    }
    if select.count(&ctx.db).await? > 0 {
        return Err(CrmError::conflict(format!(
            "Email '{}' is already registered",
            email
        )));
    }
    Ok(())
}

async fn check_branch(ctx: &RequestContext, branch_id: Option<i32>) -> Result<()> {
    let Some(branch_id) = branch_id else {
        return Ok(());
    };
    let found = branch::Entity::find_by_id(branch_id).one(&ctx.db).await?;
    if !found.is_some_and(|b| b.is_active) {
        return Err(CrmError::validation(format!(
            "Branch {} does not exist or is inactive",
            branch_id
        )));
    }
    Ok(())
}

async fn role_names<C: ConnectionTrait>(db: &C) -> Result<HashMap<i32, String>> {
    Ok(role::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|r| (r.id, r.name))
        .collect())
}

async fn role_id<C: ConnectionTrait>(db: &C, role: Role) -> Result<i32> {
    role::Entity::find()
        .filter(role::Column::Name.eq(role.as_ref()))
        .one(db)
        .await?
        .map(|r| r.id)
        .ok_or_else(|| CrmError::validation(format!("Role '{}' does not exist", role)))
}

fn view(user: user::Model, roles: &HashMap<i32, String>) -> UserView {
    let role = roles
        .get(&user.role_id)
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());
    UserView::new(user, role)
}

// ============ Modules ============

/// 当前租户启用的业务模块
pub async fn list_modules(ctx: &RequestContext) -> Result<Vec<module::Model>> {
    Ok(module::Entity::find()
        .filter(module::Column::IsActive.eq(true))
        .order_by_asc(module::Column::Id)
        .all(&ctx.db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" nyc-01 ").unwrap(), "NYC-01");
        assert!(normalize_code("NY C").is_err());
        assert!(normalize_code("").is_err());
        assert!(normalize_code(&"X".repeat(17)).is_err());
    }
}
