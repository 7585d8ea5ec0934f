//! 商品
//!
//! SKU 在整个租户内唯一；分类、单位、供应商必须与商品处于同一模块和分支。

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::info;

use crate::access::{
    Action, BranchScoped, RequestContext, Resource, find_scoped, resolve_branch_for_create,
};
use crate::errors::{CrmError, Result};
use crate::services::checks::{ensure_reference, ensure_unreferenced};
use crate::services::{Page, Pagination, double_option, fetch_page, like_pattern};
use crate::utils::validation;
use migration::entities::crm::{category, lead, product, unit, vendor};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub search: Option<String>,
    pub category_id: Option<i32>,
    pub vendor_id: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub sku: String,
    pub category_id: Option<i32>,
    pub unit_id: Option<i32>,
    pub vendor_id: Option<i32>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub branch_id: Option<i32>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub unit_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub vendor_id: Option<Option<i32>>,
    pub price: Option<f64>,
    pub cost: Option<f64>,
    pub stock_quantity: Option<i32>,
    pub is_active: Option<bool>,
}

pub async fn list(ctx: &RequestContext, query: ProductQuery) -> Result<Page<product::Model>> {
    ctx.authorize(Resource::Products, Action::View)?;

    let mut select = product::Entity::scoped(ctx);
    if let Some(pattern) = like_pattern(query.search.as_deref()) {
        select = select.filter(
            Condition::any()
                .add(product::Column::Name.like(pattern.clone()))
                .add(product::Column::Sku.like(pattern)),
        );
    }
    if let Some(category_id) = query.category_id {
        select = select.filter(product::Column::CategoryId.eq(category_id));
    }
    if let Some(vendor_id) = query.vendor_id {
        select = select.filter(product::Column::VendorId.eq(vendor_id));
    }
    if let Some(is_active) = query.is_active {
        select = select.filter(product::Column::IsActive.eq(is_active));
    }

    fetch_page(
        select.order_by_desc(product::Column::CreatedAt),
        &ctx.db,
        Pagination::new(query.page, query.page_size),
    )
    .await
}

pub async fn get(ctx: &RequestContext, id: i32) -> Result<product::Model> {
    ctx.authorize(Resource::Products, Action::View)?;
    find_scoped::<product::Entity>(id, ctx).await
}

pub async fn create(ctx: &RequestContext, input: CreateProduct) -> Result<product::Model> {
    ctx.authorize(Resource::Products, Action::Create)?;

    let name = validation::required_text("name", &input.name, 160)?;
    let sku = normalize_sku(&input.sku)?;
    let price = validation::non_negative("price", input.price)?;
    let cost = validation::non_negative("cost", input.cost)?;
    let stock_quantity = non_negative_stock(input.stock_quantity)?;
    let branch_id = resolve_branch_for_create(ctx, input.branch_id).await?;

    ensure_sku_free(ctx, &sku, None).await?;
    ensure_reference::<category::Entity>(ctx, branch_id, "category_id", input.category_id)
        .await?;
    ensure_reference::<unit::Entity>(ctx, branch_id, "unit_id", input.unit_id).await?;
    ensure_reference::<vendor::Entity>(ctx, branch_id, "vendor_id", input.vendor_id).await?;

    let now = Utc::now();
    let created = product::ActiveModel {
        module_id: Set(ctx.module_id),
        branch_id: Set(branch_id),
        name: Set(name),
        sku: Set(sku),
        category_id: Set(input.category_id),
        unit_id: Set(input.unit_id),
        vendor_id: Set(input.vendor_id),
        price: Set(price),
        cost: Set(cost),
        stock_quantity: Set(stock_quantity),
        is_active: Set(input.is_active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&ctx.db)
    .await?;

    info!(
        "Product {} ({}) created by user {}",
        created.id, created.sku, ctx.user_id
    );
    Ok(created)
}

pub async fn update(
    ctx: &RequestContext,
    id: i32,
    input: UpdateProduct,
) -> Result<product::Model> {
    ctx.authorize(Resource::Products, Action::Update)?;

    let existing = find_scoped::<product::Entity>(id, ctx).await?;
    let branch_id = existing.branch_id;
    let mut model = existing.into_active_model();

    if let Some(name) = input.name {
        model.name = Set(validation::required_text("name", &name, 160)?);
    }
    if let Some(sku) = input.sku {
        let sku = normalize_sku(&sku)?;
        ensure_sku_free(ctx, &sku, Some(id)).await?;
        model.sku = Set(sku);
    }
    if let Some(category_id) = input.category_id {
        ensure_reference::<category::Entity>(ctx, branch_id, "category_id", category_id)
            .await?;
        model.category_id = Set(category_id);
    }
    if let Some(unit_id) = input.unit_id {
        ensure_reference::<unit::Entity>(ctx, branch_id, "unit_id", unit_id).await?;
        model.unit_id = Set(unit_id);
    }
    if let Some(vendor_id) = input.vendor_id {
        ensure_reference::<vendor::Entity>(ctx, branch_id, "vendor_id", vendor_id).await?;
        model.vendor_id = Set(vendor_id);
    }
    if let Some(price) = input.price {
        model.price = Set(validation::non_negative("price", price)?);
    }
    if let Some(cost) = input.cost {
        model.cost = Set(validation::non_negative("cost", cost)?);
    }
    if let Some(stock_quantity) = input.stock_quantity {
        model.stock_quantity = Set(non_negative_stock(stock_quantity)?);
    }
    if let Some(is_active) = input.is_active {
        model.is_active = Set(is_active);
    }

    model.updated_at = Set(Utc::now());
    Ok(model.update(&ctx.db).await?)
}

pub async fn delete(ctx: &RequestContext, id: i32) -> Result<()> {
    ctx.authorize(Resource::Products, Action::Delete)?;

    let existing = find_scoped::<product::Entity>(id, ctx).await?;
    ensure_unreferenced::<lead::Entity, _>(
        &ctx.db,
        lead::Column::ProductId,
        id,
        &format!("Product {}", id),
        "leads",
    )
    .await?;
    existing.delete(&ctx.db).await?;
    info!("Product {} deleted by user {}", id, ctx.user_id);
    Ok(())
}

fn normalize_sku(raw: &str) -> Result<String> {
    let sku = validation::required_text("sku", raw, 64)?.to_ascii_uppercase();
    if sku.chars().any(char::is_whitespace) {
        return Err(CrmError::validation("sku cannot contain whitespace"));
    }
    Ok(sku)
}

fn non_negative_stock(quantity: i32) -> Result<i32> {
    if quantity < 0 {
        return Err(CrmError::validation(
            "stock_quantity must be zero or greater",
        ));
    }
    Ok(quantity)
}

/// SKU 全租户唯一，不受模块/分支限制
async fn ensure_sku_free(ctx: &RequestContext, sku: &str, exclude: Option<i32>) -> Result<()> {
    let mut select = product::Entity::find().filter(product::Column::Sku.eq(sku));
    if let Some(id) = exclude {
        select = select.filter(product::Column::Id.ne(id));
    }
    if select.count(&ctx.db).await? > 0 {
        return Err(CrmError::conflict(format!("SKU '{}' is already in use", sku)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_sku() {
        assert_eq!(normalize_sku(" ab-100 ").unwrap(), "AB-100");
        assert!(normalize_sku("AB 100").is_err());
        assert!(normalize_sku("").is_err());
    }

    #[test]
    fn test_non_negative_stock() {
        assert_eq!(non_negative_stock(0).unwrap(), 0);
        assert!(non_negative_stock(-1).is_err());
    }
}
