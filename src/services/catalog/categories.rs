//! 商品分类（可指定父分类）

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, IntoActiveModel, ModelTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::info;

use crate::access::{
    Action, BranchScoped, RequestContext, Resource, find_scoped, resolve_branch_for_create,
};
use crate::errors::{CrmError, Result};
use crate::services::checks::{
    ensure_reference, ensure_unique_in_branch, ensure_unreferenced,
};
use crate::services::{Page, Pagination, double_option, fetch_page, like_pattern};
use crate::utils::validation;
use migration::entities::crm::{category, product, service};

const NAME_MAX: usize = 120;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub search: Option<String>,
    pub parent_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategory {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i32>,
    pub branch_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategory {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<i32>>,
}

pub async fn list(ctx: &RequestContext, query: CategoryQuery) -> Result<Page<category::Model>> {
    ctx.authorize(Resource::Categories, Action::View)?;

    let mut select = category::Entity::scoped(ctx);
    if let Some(pattern) = like_pattern(query.search.as_deref()) {
        select = select.filter(category::Column::Name.like(pattern));
    }
    if let Some(parent_id) = query.parent_id {
        select = select.filter(category::Column::ParentId.eq(parent_id));
    }

    fetch_page(
        select.order_by_desc(category::Column::CreatedAt),
        &ctx.db,
        Pagination::new(query.page, query.page_size),
    )
    .await
}

pub async fn get(ctx: &RequestContext, id: i32) -> Result<category::Model> {
    ctx.authorize(Resource::Categories, Action::View)?;
    find_scoped::<category::Entity>(id, ctx).await
}

pub async fn create(ctx: &RequestContext, input: CreateCategory) -> Result<category::Model> {
    ctx.authorize(Resource::Categories, Action::Create)?;

    let name = validation::required_text("name", &input.name, NAME_MAX)?;
    let branch_id = resolve_branch_for_create(ctx, input.branch_id).await?;
    ensure_unique_in_branch::<category::Entity>(ctx, branch_id, category::Column::Name, &name, None)
        .await?;
    ensure_reference::<category::Entity>(ctx, branch_id, "parent_id", input.parent_id)
        .await?;

    let now = Utc::now();
    let created = category::ActiveModel {
        module_id: Set(ctx.module_id),
        branch_id: Set(branch_id),
        name: Set(name),
        description: Set(validation::optional_text(
            "description",
            input.description.as_deref(),
            2000,
        )?),
        parent_id: Set(input.parent_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&ctx.db)
    .await?;

    info!("Category {} created by user {}", created.id, ctx.user_id);
    Ok(created)
}

pub async fn update(
    ctx: &RequestContext,
    id: i32,
    input: UpdateCategory,
) -> Result<category::Model> {
    ctx.authorize(Resource::Categories, Action::Update)?;

    let existing = find_scoped::<category::Entity>(id, ctx).await?;
    let branch_id = existing.branch_id;
    let mut model = existing.into_active_model();

    if let Some(name) = input.name {
        let name = validation::required_text("name", &name, NAME_MAX)?;
        ensure_unique_in_branch::<category::Entity>(
            ctx,
            branch_id,
            category::Column::Name,
            &name,
            Some(id),
        )
        .await?;
        model.name = Set(name);
    }
    if let Some(description) = input.description {
        model.description = Set(validation::optional_text(
            "description",
            description.as_deref(),
            2000,
        )?);
    }
    if let Some(parent_id) = input.parent_id {
        if parent_id == Some(id) {
            return Err(CrmError::validation("A category cannot be its own parent"));
        }
        ensure_reference::<category::Entity>(ctx, branch_id, "parent_id", parent_id)
            .await?;
        model.parent_id = Set(parent_id);
    }

    model.updated_at = Set(Utc::now());
    Ok(model.update(&ctx.db).await?)
}

pub async fn delete(ctx: &RequestContext, id: i32) -> Result<()> {
    ctx.authorize(Resource::Categories, Action::Delete)?;

    let existing = find_scoped::<category::Entity>(id, ctx).await?;
    let subject = format!("Category {}", id);
    ensure_unreferenced::<category::Entity, _>(
        &ctx.db,
        category::Column::ParentId,
        id,
        &subject,
        "sub-categories",
    )
    .await?;
    ensure_unreferenced::<product::Entity, _>(
        &ctx.db,
        product::Column::CategoryId,
        id,
        &subject,
        "products",
    )
    .await?;
    ensure_unreferenced::<service::Entity, _>(
        &ctx.db,
        service::Column::CategoryId,
        id,
        &subject,
        "services",
    )
    .await?;
    existing.delete(&ctx.db).await?;
    info!("Category {} deleted by user {}", id, ctx.user_id);
    Ok(())
}
