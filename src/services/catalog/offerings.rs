//! 服务项目（services 资源）

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
use crate::services::checks::ensure_reference;
use crate::services::{Page, Pagination, double_option, fetch_page, like_pattern};
use crate::utils::validation;
use migration::entities::crm::{category, service};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferingQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub search: Option<String>,
    pub category_id: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOffering {
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    #[serde(default)]
    pub price: f64,
    pub duration_minutes: Option<i32>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub branch_id: Option<i32>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOffering {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<i32>>,
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "double_option")]
    pub duration_minutes: Option<Option<i32>>,
    pub is_active: Option<bool>,
}

pub async fn list(ctx: &RequestContext, query: OfferingQuery) -> Result<Page<service::Model>> {
    ctx.authorize(Resource::Services, Action::View)?;

    let mut select = service::Entity::scoped(ctx);
    if let Some(pattern) = like_pattern(query.search.as_deref()) {
        select = select.filter(service::Column::Name.like(pattern));
    }
    if let Some(category_id) = query.category_id {
        select = select.filter(service::Column::CategoryId.eq(category_id));
    }
    if let Some(is_active) = query.is_active {
        select = select.filter(service::Column::IsActive.eq(is_active));
    }

    fetch_page(
        select.order_by_desc(service::Column::CreatedAt),
        &ctx.db,
        Pagination::new(query.page, query.page_size),
    )
    .await
}

pub async fn get(ctx: &RequestContext, id: i32) -> Result<service::Model> {
    ctx.authorize(Resource::Services, Action::View)?;
    find_scoped::<service::Entity>(id, ctx).await
}

pub async fn create(ctx: &RequestContext, input: CreateOffering) -> Result<service::Model> {
    ctx.authorize(Resource::Services, Action::Create)?;

    let name = validation::required_text("name", &input.name, 160)?;
    let price = validation::non_negative("price", input.price)?;
    let duration_minutes = check_duration(input.duration_minutes)?;
    let branch_id = resolve_branch_for_create(ctx, input.branch_id).await?;
    ensure_reference::<category::Entity>(ctx, branch_id, "category_id", input.category_id)
        .await?;

    let now = Utc::now();
    let created = service::ActiveModel {
        module_id: Set(ctx.module_id),
        branch_id: Set(branch_id),
        name: Set(name),
        description: Set(validation::optional_text(
            "description",
            input.description.as_deref(),
            2000,
        )?),
        category_id: Set(input.category_id),
        price: Set(price),
        duration_minutes: Set(duration_minutes),
        is_active: Set(input.is_active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&ctx.db)
    .await?;

    info!("Service {} created by user {}", created.id, ctx.user_id);
    Ok(created)
}

pub async fn update(
    ctx: &RequestContext,
    id: i32,
    input: UpdateOffering,
) -> Result<service::Model> {
    ctx.authorize(Resource::Services, Action::Update)?;

    let existing = find_scoped::<service::Entity>(id, ctx).await?;
    let branch_id = existing.branch_id;
    let mut model = existing.into_active_model();

    if let Some(name) = input.name {
        model.name = Set(validation::required_text("name", &name, 160)?);
    }
    if let Some(description) = input.description {
        model.description = Set(validation::optional_text(
            "description",
            description.as_deref(),
            2000,
        )?);
    }
    if let Some(category_id) = input.category_id {
        ensure_reference::<category::Entity>(ctx, branch_id, "category_id", category_id)
            .await?;
        model.category_id = Set(category_id);
    }
    if let Some(price) = input.price {
        model.price = Set(validation::non_negative("price", price)?);
    }
    if let Some(duration_minutes) = input.duration_minutes {
        model.duration_minutes = Set(check_duration(duration_minutes)?);
    }
    if let Some(is_active) = input.is_active {
        model.is_active = Set(is_active);
    }

    model.updated_at = Set(Utc::now());
    Ok(model.update(&ctx.db).await?)
}

pub async fn delete(ctx: &RequestContext, id: i32) -> Result<()> {
    ctx.authorize(Resource::Services, Action::Delete)?;

    find_scoped::<service::Entity>(id, ctx)
        .await?
        .delete(&ctx.db)
        .await?;
    info!("Service {} deleted by user {}", id, ctx.user_id);
    Ok(())
}

fn check_duration(minutes: Option<i32>) -> Result<Option<i32>> {
    match minutes {
        Some(m) if m <= 0 => Err(CrmError::validation(
            "duration_minutes must be greater than zero",
        )),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_duration() {
        assert_eq!(check_duration(None).unwrap(), None);
        assert_eq!(check_duration(Some(45)).unwrap(), Some(45));
        assert!(check_duration(Some(0)).is_err());
        assert!(check_duration(Some(-5)).is_err());
    }
}
