//! 计量单位

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, IntoActiveModel, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use tracing::info;

use crate::access::{
    Action, BranchScoped, RequestContext, Resource, find_scoped, resolve_branch_for_create,
};
use crate::errors::Result;
use crate::services::checks::{ensure_unique_in_branch, ensure_unreferenced};
use crate::services::{Page, Pagination, fetch_page, like_pattern};
use crate::utils::validation;
use migration::entities::crm::{product, unit};

const NAME_MAX: usize = 60;
const SHORT_NAME_MAX: usize = 16;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUnit {
    pub name: String,
    pub short_name: String,
    pub branch_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUnit {
    pub name: Option<String>,
    pub short_name: Option<String>,
}

pub async fn list(ctx: &RequestContext, query: UnitQuery) -> Result<Page<unit::Model>> {
    ctx.authorize(Resource::Units, Action::View)?;

    let mut select = unit::Entity::scoped(ctx);
    if let Some(pattern) = like_pattern(query.search.as_deref()) {
        select = select.filter(
            Condition::any()
                .add(unit::Column::Name.like(pattern.clone()))
                .add(unit::Column::ShortName.like(pattern)),
        );
    }

    fetch_page(
        select.order_by_desc(unit::Column::CreatedAt),
        &ctx.db,
        Pagination::new(query.page, query.page_size),
    )
    .await
}

pub async fn get(ctx: &RequestContext, id: i32) -> Result<unit::Model> {
    ctx.authorize(Resource::Units, Action::View)?;
    find_scoped::<unit::Entity>(id, ctx).await
}

pub async fn create(ctx: &RequestContext, input: CreateUnit) -> Result<unit::Model> {
    ctx.authorize(Resource::Units, Action::Create)?;

    let name = validation::required_text("name", &input.name, NAME_MAX)?;
    let short_name = validation::required_text("short_name", &input.short_name, SHORT_NAME_MAX)?;
    let branch_id = resolve_branch_for_create(ctx, input.branch_id).await?;
    ensure_unique_in_branch::<unit::Entity>(
        ctx,
        branch_id,
        unit::Column::ShortName,
        &short_name,
        None,
    )
    .await?;

    let now = Utc::now();
    let created = unit::ActiveModel {
        module_id: Set(ctx.module_id),
        branch_id: Set(branch_id),
        name: Set(name),
        short_name: Set(short_name),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&ctx.db)
    .await?;

    info!("Unit {} created by user {}", created.id, ctx.user_id);
    Ok(created)
}

pub async fn update(ctx: &RequestContext, id: i32, input: UpdateUnit) -> Result<unit::Model> {
    ctx.authorize(Resource::Units, Action::Update)?;

    let existing = find_scoped::<unit::Entity>(id, ctx).await?;
    let branch_id = existing.branch_id;
    let mut model = existing.into_active_model();

    if let Some(name) = input.name {
        model.name = Set(validation::required_text("name", &name, NAME_MAX)?);
    }
    if let Some(short_name) = input.short_name {
        let short_name = validation::required_text("short_name", &short_name, SHORT_NAME_MAX)?;
        ensure_unique_in_branch::<unit::Entity>(
            ctx,
            branch_id,
            unit::Column::ShortName,
            &short_name,
            Some(id),
        )
        .await?;
        model.short_name = Set(short_name);
    }

    model.updated_at = Set(Utc::now());
    Ok(model.update(&ctx.db).await?)
}

pub async fn delete(ctx: &RequestContext, id: i32) -> Result<()> {
    ctx.authorize(Resource::Units, Action::Delete)?;

    let existing = find_scoped::<unit::Entity>(id, ctx).await?;
    let subject = format!("Unit {}", id);
    ensure_unreferenced::<product::Entity, _>(
        &ctx.db,
        product::Column::UnitId,
        id,
        &subject,
        "products",
    )
    .await?;
    existing.delete(&ctx.db).await?;
    info!("Unit {} deleted by user {}", id, ctx.user_id);
    Ok(())
}
