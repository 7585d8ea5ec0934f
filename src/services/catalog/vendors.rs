//! 供应商

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
use crate::services::checks::ensure_unreferenced;
use crate::services::{Page, Pagination, double_option, fetch_page, like_pattern};
use crate::utils::validation;
use migration::entities::crm::{product, vendor};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VendorQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVendor {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub branch_id: Option<i32>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVendor {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,
    pub is_active: Option<bool>,
}

pub async fn list(ctx: &RequestContext, query: VendorQuery) -> Result<Page<vendor::Model>> {
    ctx.authorize(Resource::Vendors, Action::View)?;

    let mut select = vendor::Entity::scoped(ctx);
    if let Some(pattern) = like_pattern(query.search.as_deref()) {
        select = select.filter(
            Condition::any()
                .add(vendor::Column::Name.like(pattern.clone()))
                .add(vendor::Column::Email.like(pattern)),
        );
    }
    if let Some(is_active) = query.is_active {
        select = select.filter(vendor::Column::IsActive.eq(is_active));
    }

    fetch_page(
        select.order_by_desc(vendor::Column::CreatedAt),
        &ctx.db,
        Pagination::new(query.page, query.page_size),
    )
    .await
}

pub async fn get(ctx: &RequestContext, id: i32) -> Result<vendor::Model> {
    ctx.authorize(Resource::Vendors, Action::View)?;
    find_scoped::<vendor::Entity>(id, ctx).await
}

pub async fn create(ctx: &RequestContext, input: CreateVendor) -> Result<vendor::Model> {
    ctx.authorize(Resource::Vendors, Action::Create)?;

    let branch_id = resolve_branch_for_create(ctx, input.branch_id).await?;
    let now = Utc::now();
    let created = vendor::ActiveModel {
        module_id: Set(ctx.module_id),
        branch_id: Set(branch_id),
        name: Set(validation::required_text("name", &input.name, 120)?),
        email: Set(validation::optional_email("email", input.email.as_deref())?),
        phone: Set(validation::optional_text("phone", input.phone.as_deref(), 40)?),
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

    info!("Vendor {} created by user {}", created.id, ctx.user_id);
    Ok(created)
}

pub async fn update(ctx: &RequestContext, id: i32, input: UpdateVendor) -> Result<vendor::Model> {
    ctx.authorize(Resource::Vendors, Action::Update)?;

    let mut model = find_scoped::<vendor::Entity>(id, ctx)
        .await?
        .into_active_model();

    if let Some(name) = input.name {
        model.name = Set(validation::required_text("name", &name, 120)?);
    }
    if let Some(email) = input.email {
        model.email = Set(validation::optional_email("email", email.as_deref())?);
    }
    if let Some(phone) = input.phone {
        model.phone = Set(validation::optional_text("phone", phone.as_deref(), 40)?);
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

pub async fn delete(ctx: &RequestContext, id: i32) -> Result<()> {
    ctx.authorize(Resource::Vendors, Action::Delete)?;

    let existing = find_scoped::<vendor::Entity>(id, ctx).await?;
    let subject = format!("Vendor {}", id);
    ensure_unreferenced::<product::Entity, _>(
        &ctx.db,
        product::Column::VendorId,
        id,
        &subject,
        "products",
    )
    .await?;
    existing.delete(&ctx.db).await?;
    info!("Vendor {} deleted by user {}", id, ctx.user_id);
    Ok(())
}
