//! 线索
//!
//! Executive 只能看到和修改分配给自己的线索；状态进入 won/lost 时记录 `closed_at`，
//! 回到其他状态时清空。每次写入后重算受影响的销售目标。

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::info;

use super::checks::{ensure_reference, ensure_user_in_branch};
use super::targets::refresh_for_leads;
use crate::access::{
    Action, BranchScoped, RequestContext, Resource, Role, find_scoped, resolve_branch_for_create,
};
use crate::errors::{CrmError, Result};
use crate::services::{Page, Pagination, double_option, fetch_page, like_pattern};
use crate::utils::validation;
use migration::entities::crm::{lead, product, team};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Proposal,
    Won,
    Lost,
}

impl LeadStatus {
    pub fn is_closed(self) -> bool {
        matches!(self, LeadStatus::Won | LeadStatus::Lost)
    }

    /// 状态变化后的 closed_at
    pub fn closed_at_after(
        self,
        previous: Option<LeadStatus>,
        previous_closed_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if !self.is_closed() {
            None
        } else if previous == Some(self) {
            previous_closed_at.or(Some(now))
        } else {
            Some(now)
        }
    }
}

fn parse_status(raw: &str) -> LeadStatus {
    raw.parse().unwrap_or(LeadStatus::New)
}

// ============ Request DTOs ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub search: Option<String>,
    pub status: Option<LeadStatus>,
    pub assigned_to: Option<i32>,
    pub team_id: Option<i32>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLead {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub source: Option<String>,
    pub status: Option<LeadStatus>,
    #[serde(default)]
    pub value: f64,
    pub assigned_to: Option<i32>,
    pub team_id: Option<i32>,
    pub product_id: Option<i32>,
    pub notes: Option<String>,
    pub branch_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLead {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub company_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub source: Option<Option<String>>,
    pub status: Option<LeadStatus>,
    pub value: Option<f64>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub team_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub product_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeStatus {
    pub status: LeadStatus,
}

/// CSV 导出的一行
#[derive(Debug, Serialize)]
struct LeadCsvRow {
    id: i32,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    company_name: Option<String>,
    source: Option<String>,
    status: String,
    value: f64,
    assigned_to: Option<i32>,
    team_id: Option<i32>,
    branch_id: i32,
    closed_at: Option<String>,
    created_at: String,
}

impl From<lead::Model> for LeadCsvRow {
    fn from(lead: lead::Model) -> Self {
        Self {
            id: lead.id,
            name: lead.name,
            email: lead.email,
            phone: lead.phone,
            company_name: lead.company_name,
            source: lead.source,
            status: lead.status,
            value: lead.value,
            assigned_to: lead.assigned_to,
            team_id: lead.team_id,
            branch_id: lead.branch_id,
            closed_at: lead.closed_at.map(|t| t.to_rfc3339()),
            created_at: lead.created_at.to_rfc3339(),
        }
    }
}

// ============ Queries ============

/// 分支范围 + Executive 只看自己的线索
fn visible(ctx: &RequestContext) -> Select<lead::Entity> {
    let select = lead::Entity::scoped(ctx);
    if ctx.role == Role::Executive {
        select.filter(lead::Column::AssignedTo.eq(ctx.user_id))
    } else {
        select
    }
}

async fn find_visible(ctx: &RequestContext, id: i32) -> Result<lead::Model> {
    if ctx.role == Role::Executive {
        visible(ctx)
            .filter(lead::Column::Id.eq(id))
            .one(&ctx.db)
            .await?
            .ok_or_else(|| CrmError::not_found(format!("Lead {} not found", id)))
    } else {
        find_scoped::<lead::Entity>(id, ctx).await
    }
}

fn filtered(ctx: &RequestContext, query: &LeadQuery) -> Select<lead::Entity> {
    let mut select = visible(ctx);
    if let Some(pattern) = like_pattern(query.search.as_deref()) {
        select = select.filter(
            Condition::any()
                .add(lead::Column::Name.like(pattern.clone()))
                .add(lead::Column::Email.like(pattern.clone()))
                .add(lead::Column::CompanyName.like(pattern)),
        );
    }
    if let Some(status) = query.status {
        select = select.filter(lead::Column::Status.eq(status.as_ref()));
    }
    if let Some(assigned_to) = query.assigned_to {
        select = select.filter(lead::Column::AssignedTo.eq(assigned_to));
    }
    if let Some(team_id) = query.team_id {
        select = select.filter(lead::Column::TeamId.eq(team_id));
    }
    if let Some(source) = query.source.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        select = select.filter(lead::Column::Source.eq(source));
    }
    select.order_by_desc(lead::Column::CreatedAt)
}

pub async fn list(ctx: &RequestContext, query: LeadQuery) -> Result<Page<lead::Model>> {
    ctx.authorize(Resource::Leads, Action::View)?;

    let pagination = Pagination::new(query.page, query.page_size);
    fetch_page(filtered(ctx, &query), &ctx.db, pagination).await
}

pub async fn get(ctx: &RequestContext, id: i32) -> Result<lead::Model> {
    ctx.authorize(Resource::Leads, Action::View)?;
    find_visible(ctx, id).await
}

/// 导出为 CSV（与列表相同的过滤条件，不分页）
pub async fn export_csv(ctx: &RequestContext, query: LeadQuery) -> Result<Vec<u8>> {
    ctx.authorize(Resource::Leads, Action::View)?;

    let leads = filtered(ctx, &query).all(&ctx.db).await?;
    let count = leads.len();

    let mut writer = csv::Writer::from_writer(Vec::new());
    for lead in leads {
        writer.serialize(LeadCsvRow::from(lead))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| CrmError::serialization(format!("Failed to finish CSV export: {}", e)))?;

    info!("Exported {} leads for user {}", count, ctx.user_id);
    Ok(bytes)
}

// ============ Mutations ============

pub async fn create(ctx: &RequestContext, input: CreateLead) -> Result<lead::Model> {
    ctx.authorize(Resource::Leads, Action::Create)?;

    let name = validation::required_text("name", &input.name, 160)?;
    let value = validation::non_negative("value", input.value)?;
    let status = input.status.unwrap_or(LeadStatus::New);
    let branch_id = resolve_branch_for_create(ctx, input.branch_id).await?;

    // Executive 创建的线索归属自己
    let assigned_to = if ctx.role == Role::Executive {
        match input.assigned_to {
            Some(other) if other != ctx.user_id => {
                return Err(CrmError::forbidden(
                    "Executives can only create leads assigned to themselves",
                ));
            }
            _ => Some(ctx.user_id),
        }
    } else {
        input.assigned_to
    };
    check_assignee(ctx, branch_id, assigned_to).await?;
    ensure_reference::<team::Entity>(ctx, branch_id, "team_id", input.team_id).await?;
    ensure_reference::<product::Entity>(ctx, branch_id, "product_id", input.product_id).await?;

    let now = Utc::now();
    let model = lead::ActiveModel {
        module_id: Set(ctx.module_id),
        branch_id: Set(branch_id),
        name: Set(name),
        email: Set(validation::optional_email("email", input.email.as_deref())?),
        phone: Set(validation::optional_text("phone", input.phone.as_deref(), 40)?),
        company_name: Set(validation::optional_text(
            "company_name",
            input.company_name.as_deref(),
            160,
        )?),
        source: Set(validation::optional_text("source", input.source.as_deref(), 60)?),
        status: Set(status.to_string()),
        value: Set(value),
        assigned_to: Set(assigned_to),
        team_id: Set(input.team_id),
        product_id: Set(input.product_id),
        notes: Set(validation::optional_text("notes", input.notes.as_deref(), 5000)?),
        closed_at: Set(status.closed_at_after(None, None, now)),
        created_by: Set(ctx.user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let txn = ctx.db.begin().await?;
    let created = model.insert(&txn).await?;
    refresh_for_leads(&txn, &[&created]).await?;
    txn.commit().await?;

    info!("Lead {} created by user {}", created.id, ctx.user_id);
    Ok(created)
}

pub async fn update(ctx: &RequestContext, id: i32, input: UpdateLead) -> Result<lead::Model> {
    ctx.authorize(Resource::Leads, Action::Update)?;

    let before = find_visible(ctx, id).await?;
    let mut model = before.clone().into_active_model();

    if let Some(name) = input.name {
        model.name = Set(validation::required_text("name", &name, 160)?);
    }
    if let Some(email) = input.email {
        model.email = Set(validation::optional_email("email", email.as_deref())?);
    }
    if let Some(phone) = input.phone {
        model.phone = Set(validation::optional_text("phone", phone.as_deref(), 40)?);
    }
    if let Some(company_name) = input.company_name {
        model.company_name = Set(validation::optional_text(
            "company_name",
            company_name.as_deref(),
            160,
        )?);
    }
    if let Some(source) = input.source {
        model.source = Set(validation::optional_text("source", source.as_deref(), 60)?);
    }
    if let Some(value) = input.value {
        model.value = Set(validation::non_negative("value", value)?);
    }
    if let Some(assigned_to) = input.assigned_to {
        if ctx.role == Role::Executive && assigned_to != Some(ctx.user_id) {
            return Err(CrmError::forbidden("Executives cannot reassign leads"));
        }
        check_assignee(ctx, before.branch_id, assigned_to).await?;
        model.assigned_to = Set(assigned_to);
    }
    if let Some(team_id) = input.team_id {
        ensure_reference::<team::Entity>(ctx, before.branch_id, "team_id", team_id).await?;
        model.team_id = Set(team_id);
    }
    if let Some(product_id) = input.product_id {
        ensure_reference::<product::Entity>(ctx, before.branch_id, "product_id", product_id)
            .await?;
        model.product_id = Set(product_id);
    }
    if let Some(notes) = input.notes {
        model.notes = Set(validation::optional_text("notes", notes.as_deref(), 5000)?);
    }
    if let Some(status) = input.status {
        apply_status(&mut model, &before, status);
    }

    model.updated_at = Set(Utc::now());
    save(ctx, model, &before).await
}

/// `PATCH /leads/{id}/status`
pub async fn change_status(
    ctx: &RequestContext,
    id: i32,
    input: ChangeStatus,
) -> Result<lead::Model> {
    ctx.authorize(Resource::Leads, Action::Update)?;

    let before = find_visible(ctx, id).await?;
    let mut model = before.clone().into_active_model();
    apply_status(&mut model, &before, input.status);
    model.updated_at = Set(Utc::now());

    let updated = save(ctx, model, &before).await?;
    info!(
        "Lead {} moved from {} to {} by user {}",
        id, before.status, updated.status, ctx.user_id
    );
    Ok(updated)
}

pub async fn delete(ctx: &RequestContext, id: i32) -> Result<()> {
    ctx.authorize(Resource::Leads, Action::Delete)?;

    let existing = find_visible(ctx, id).await?;
    let txn = ctx.db.begin().await?;
    existing.clone().delete(&txn).await?;
    refresh_for_leads(&txn, &[&existing]).await?;
    txn.commit().await?;

    info!("Lead {} deleted by user {}", id, ctx.user_id);
    Ok(())
}

fn apply_status(model: &mut lead::ActiveModel, before: &lead::Model, status: LeadStatus) {
    let previous = parse_status(&before.status);
    model.status = Set(status.to_string());
    model.closed_at = Set(status.closed_at_after(Some(previous), before.closed_at, Utc::now()));
}

async fn save(
    ctx: &RequestContext,
    model: lead::ActiveModel,
    before: &lead::Model,
) -> Result<lead::Model> {
    let txn = ctx.db.begin().await?;
    let updated = model.update(&txn).await?;
    refresh_for_leads(&txn, &[before, &updated]).await?;
    txn.commit().await?;
    Ok(updated)
}

async fn check_assignee(
    ctx: &RequestContext,
    branch_id: i32,
    assigned_to: Option<i32>,
) -> Result<()> {
    if let Some(user_id) = assigned_to {
        ensure_user_in_branch(&ctx.db, "Assigned user", user_id, branch_id).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_status_parse() {
        assert_eq!("won".parse::<LeadStatus>().unwrap(), LeadStatus::Won);
        assert_eq!(LeadStatus::Proposal.to_string(), "proposal");
        assert!("archived".parse::<LeadStatus>().is_err());
        assert_eq!(parse_status("garbage"), LeadStatus::New);
    }

    #[test]
    fn test_closed_at_transitions() {
        let now = Utc::now();
        let earlier = now - Duration::days(3);

        // 进入 won：写入当前时间
        assert_eq!(
            LeadStatus::Won.closed_at_after(Some(LeadStatus::Proposal), None, now),
            Some(now)
        );
        // 保持 won：沿用原来的时间
        assert_eq!(
            LeadStatus::Won.closed_at_after(Some(LeadStatus::Won), Some(earlier), now),
            Some(earlier)
        );
        // won → lost：重新记录
        assert_eq!(
            LeadStatus::Lost.closed_at_after(Some(LeadStatus::Won), Some(earlier), now),
            Some(now)
        );
        // 回到进行中：清空
        assert_eq!(
            LeadStatus::Contacted.closed_at_after(Some(LeadStatus::Won), Some(earlier), now),
            None
        );
        assert_eq!(LeadStatus::New.closed_at_after(None, None, now), None);
    }
}
