//! 销售目标与进度计算
//!
//! 进度 = 目标周期内（按自然日，首尾都包含）赢单线索金额之和 / 目标金额。
//! 个人目标统计分配给该用户的线索，团队目标统计分配给任一团队成员的线索。

use std::collections::BTreeSet;

use chrono::{DateTime, Days, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, IntoActiveModel,
    ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::{debug, info};

use crate::access::{
    Action, BranchScoped, RequestContext, Resource, find_scoped, resolve_branch_for_create,
};
use crate::errors::{CrmError, Result};
use crate::services::checks::{ensure_reference, ensure_user_in_branch};
use crate::services::leads::LeadStatus;
use crate::services::{Page, Pagination, fetch_page, like_pattern};
use crate::utils::validation;
use migration::entities::crm::{lead, target, team, team_member};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TargetStatus {
    Active,
    Achieved,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub achieved_amount: f64,
    /// 百分比，两位小数，最高 100
    pub progress: f64,
    pub status: TargetStatus,
}

/// 纯计算部分，不访问数据库
pub fn compute_progress(
    achieved_amount: f64,
    target_amount: f64,
    end_date: NaiveDate,
    today: NaiveDate,
) -> Progress {
    let progress = if target_amount > 0.0 {
        let pct = (achieved_amount / target_amount * 100.0).min(100.0);
        (pct * 100.0).round() / 100.0
    } else {
        0.0
    };

    let status = if target_amount > 0.0 && achieved_amount >= target_amount {
        TargetStatus::Achieved
    } else if end_date < today {
        TargetStatus::Expired
    } else {
        TargetStatus::Active
    };

    Progress {
        achieved_amount,
        progress,
        status,
    }
}

// ============ Request DTOs ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub search: Option<String>,
    pub user_id: Option<i32>,
    pub team_id: Option<i32>,
    pub status: Option<TargetStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTarget {
    pub title: String,
    pub user_id: Option<i32>,
    pub team_id: Option<i32>,
    pub target_amount: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub branch_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTarget {
    pub title: Option<String>,
    pub user_id: Option<i32>,
    pub team_id: Option<i32>,
    pub target_amount: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

// ============ CRUD ============

pub async fn list(ctx: &RequestContext, query: TargetQuery) -> Result<Page<target::Model>> {
    ctx.authorize(Resource::Targets, Action::View)?;

    let mut select = target::Entity::scoped(ctx);
    if let Some(pattern) = like_pattern(query.search.as_deref()) {
        select = select.filter(target::Column::Title.like(pattern));
    }
    if let Some(user_id) = query.user_id {
        select = select.filter(target::Column::UserId.eq(user_id));
    }
    if let Some(team_id) = query.team_id {
        select = select.filter(target::Column::TeamId.eq(team_id));
    }
    if let Some(status) = query.status {
        select = select.filter(target::Column::Status.eq(status.as_ref()));
    }

    fetch_page(
        select.order_by_desc(target::Column::CreatedAt),
        &ctx.db,
        Pagination::new(query.page, query.page_size),
    )
    .await
}

pub async fn get(ctx: &RequestContext, id: i32) -> Result<target::Model> {
    ctx.authorize(Resource::Targets, Action::View)?;
    find_scoped::<target::Entity>(id, ctx).await
}

pub async fn create(ctx: &RequestContext, input: CreateTarget) -> Result<target::Model> {
    ctx.authorize(Resource::Targets, Action::Create)?;

    let title = validation::required_text("title", &input.title, 160)?;
    let target_amount = validation::positive("target_amount", input.target_amount)?;
    check_window(input.start_date, input.end_date)?;
    let branch_id = resolve_branch_for_create(ctx, input.branch_id).await?;
    check_owner(ctx, branch_id, input.user_id, input.team_id).await?;

    let now = Utc::now();
    let created = target::ActiveModel {
        module_id: Set(ctx.module_id),
        branch_id: Set(branch_id),
        title: Set(title),
        user_id: Set(input.user_id),
        team_id: Set(input.team_id),
        target_amount: Set(target_amount),
        achieved_amount: Set(0.0),
        progress: Set(0.0),
        status: Set(TargetStatus::Active.to_string()),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&ctx.db)
    .await?;

    info!("Target {} created by user {}", created.id, ctx.user_id);
    update_progress(&ctx.db, created).await
}

pub async fn update(ctx: &RequestContext, id: i32, input: UpdateTarget) -> Result<target::Model> {
    ctx.authorize(Resource::Targets, Action::Update)?;

    let existing = find_scoped::<target::Entity>(id, ctx).await?;

    let start_date = input.start_date.unwrap_or(existing.start_date);
    let end_date = input.end_date.unwrap_or(existing.end_date);
    check_window(start_date, end_date)?;

    // 指定其中一个即切换归属
    let (user_id, team_id) = match (input.user_id, input.team_id) {
        (None, None) => (existing.user_id, existing.team_id),
        (user_id, team_id) => (user_id, team_id),
    };
    if (user_id, team_id) != (existing.user_id, existing.team_id) {
        check_owner(ctx, existing.branch_id, user_id, team_id).await?;
    }

    let mut model = existing.into_active_model();
    if let Some(title) = input.title {
        model.title = Set(validation::required_text("title", &title, 160)?);
    }
    if let Some(target_amount) = input.target_amount {
        model.target_amount = Set(validation::positive("target_amount", target_amount)?);
    }
    model.user_id = Set(user_id);
    model.team_id = Set(team_id);
    model.start_date = Set(start_date);
    model.end_date = Set(end_date);
    model.updated_at = Set(Utc::now());

    let updated = model.update(&ctx.db).await?;
    update_progress(&ctx.db, updated).await
}

pub async fn delete(ctx: &RequestContext, id: i32) -> Result<()> {
    ctx.authorize(Resource::Targets, Action::Delete)?;

    find_scoped::<target::Entity>(id, ctx)
        .await?
        .delete(&ctx.db)
        .await?;
    info!("Target {} deleted by user {}", id, ctx.user_id);
    Ok(())
}

/// `POST /targets/{id}/refresh`
pub async fn refresh(ctx: &RequestContext, id: i32) -> Result<target::Model> {
    ctx.authorize(Resource::Targets, Action::View)?;

    let existing = find_scoped::<target::Entity>(id, ctx).await?;
    update_progress(&ctx.db, existing).await
}

fn check_window(start_date: NaiveDate, end_date: NaiveDate) -> Result<()> {
    if end_date < start_date {
        return Err(CrmError::validation(
            "end_date must be on or after start_date",
        ));
    }
    Ok(())
}

/// 归属：user_id 和 team_id 必须且只能有一个，且与目标在同一分支
async fn check_owner(
    ctx: &RequestContext,
    branch_id: i32,
    user_id: Option<i32>,
    team_id: Option<i32>,
) -> Result<()> {
    match (user_id, team_id) {
        (Some(user_id), None) => {
            ensure_user_in_branch(&ctx.db, "User", user_id, branch_id).await?;
            Ok(())
        }
        (None, Some(team_id)) => {
            ensure_reference::<team::Entity>(ctx, branch_id, "team_id", Some(team_id)).await
        }
        _ => Err(CrmError::validation(
            "Exactly one of user_id or team_id must be set",
        )),
    }
}

// ============ 进度计算 ============

/// 重新计算一个目标的完成额、进度和状态并写回
pub async fn update_progress<C: ConnectionTrait>(
    db: &C,
    target: target::Model,
) -> Result<target::Model> {
    let owners = owner_user_ids(db, &target).await?;
    let achieved = if owners.is_empty() {
        0.0
    } else {
        won_amount(db, &target, &owners).await?
    };

    let today = Utc::now().date_naive();
    let computed = compute_progress(achieved, target.target_amount, target.end_date, today);

    if computed.achieved_amount == target.achieved_amount
        && computed.progress == target.progress
        && computed.status.as_ref() == target.status
    {
        return Ok(target);
    }

    let id = target.id;
    let mut model = target.into_active_model();
    model.achieved_amount = Set(computed.achieved_amount);
    model.progress = Set(computed.progress);
    model.status = Set(computed.status.to_string());
    model.updated_at = Set(Utc::now());
    let updated = model.update(db).await?;

    debug!(
        "Target {} progress: {:.2} / {:.2} ({}%, {})",
        id, updated.achieved_amount, updated.target_amount, updated.progress, updated.status
    );
    Ok(updated)
}

/// 线索变化后，重算受影响的目标（传入变更前后的快照）
pub async fn refresh_for_leads<C: ConnectionTrait>(db: &C, leads: &[&lead::Model]) -> Result<()> {
    let mut target_ids = BTreeSet::new();

    for lead in leads {
        let (Some(closed_at), Some(assigned_to)) = (lead.closed_at, lead.assigned_to) else {
            continue;
        };
        let closed_on = closed_at.date_naive();

        let teams: Vec<i32> = team_member::Entity::find()
            .select_only()
            .column(team_member::Column::TeamId)
            .filter(team_member::Column::UserId.eq(assigned_to))
            .into_tuple()
            .all(db)
            .await?;

        let mut owner = Condition::any().add(target::Column::UserId.eq(assigned_to));
        if !teams.is_empty() {
            owner = owner.add(target::Column::TeamId.is_in(teams));
        }

        let ids: Vec<i32> = target::Entity::find()
            .select_only()
            .column(target::Column::Id)
            .filter(target::Column::ModuleId.eq(lead.module_id))
            .filter(target::Column::BranchId.eq(lead.branch_id))
            .filter(target::Column::StartDate.lte(closed_on))
            .filter(target::Column::EndDate.gte(closed_on))
            .filter(owner)
            .into_tuple()
            .all(db)
            .await?;
        target_ids.extend(ids);
    }

    for id in target_ids {
        if let Some(target) = target::Entity::find_by_id(id).one(db).await? {
            update_progress(db, target).await?;
        }
    }
    Ok(())
}

async fn owner_user_ids<C: ConnectionTrait>(db: &C, target: &target::Model) -> Result<Vec<i32>> {
    if let Some(user_id) = target.user_id {
        return Ok(vec![user_id]);
    }
    let Some(team_id) = target.team_id else {
        return Ok(Vec::new());
    };

    let members = team_member::Entity::find()
        .select_only()
        .column(team_member::Column::UserId)
        .filter(team_member::Column::TeamId.eq(team_id))
        .into_tuple()
        .all(db)
        .await?;
    Ok(members)
}

async fn won_amount<C: ConnectionTrait>(
    db: &C,
    target: &target::Model,
    owners: &[i32],
) -> Result<f64> {
    let (from, until) = window_bounds(target.start_date, target.end_date);

    let values: Vec<f64> = lead::Entity::find()
        .select_only()
        .column(lead::Column::Value)
        .filter(lead::Column::ModuleId.eq(target.module_id))
        .filter(lead::Column::BranchId.eq(target.branch_id))
        .filter(lead::Column::Status.eq(LeadStatus::Won.as_ref()))
        .filter(lead::Column::ClosedAt.gte(from))
        .filter(lead::Column::ClosedAt.lt(until))
        .filter(lead::Column::AssignedTo.is_in(owners.iter().copied()))
        .into_tuple()
        .all(db)
        .await?;

    Ok(values.into_iter().sum())
}

/// [start 00:00, end 次日 00:00)
fn window_bounds(start_date: NaiveDate, end_date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = start_date.and_time(chrono::NaiveTime::MIN).and_utc();
    let until = end_date
        .checked_add_days(Days::new(1))
        .unwrap_or(end_date)
        .and_time(chrono::NaiveTime::MIN)
        .and_utc();
    (from, until)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_progress_partial() {
        let p = compute_progress(1234.0, 10_000.0, date("2026-12-31"), date("2026-06-01"));
        assert_eq!(p.progress, 12.34);
        assert_eq!(p.achieved_amount, 1234.0);
        assert_eq!(p.status, TargetStatus::Active);

        let p = compute_progress(2000.0, 3000.0, date("2026-12-31"), date("2026-06-01"));
        assert_eq!(p.progress, 66.67);
    }

    #[test]
    fn test_progress_capped_and_achieved() {
        let p = compute_progress(15_000.0, 10_000.0, date("2026-12-31"), date("2026-06-01"));
        assert_eq!(p.progress, 100.0);
        assert_eq!(p.achieved_amount, 15_000.0);
        assert_eq!(p.status, TargetStatus::Achieved);

        let exact = compute_progress(10_000.0, 10_000.0, date("2026-01-31"), date("2026-06-01"));
        assert_eq!(exact.status, TargetStatus::Achieved);
    }

    #[test]
    fn test_progress_expired() {
        let p = compute_progress(500.0, 10_000.0, date("2026-05-31"), date("2026-06-01"));
        assert_eq!(p.status, TargetStatus::Expired);
        assert_eq!(p.progress, 5.0);

        // 截止日当天仍然有效
        let p = compute_progress(500.0, 10_000.0, date("2026-06-01"), date("2026-06-01"));
        assert_eq!(p.status, TargetStatus::Active);
    }

    #[test]
    fn test_progress_zero_target() {
        let p = compute_progress(100.0, 0.0, date("2026-12-31"), date("2026-06-01"));
        assert_eq!(p.progress, 0.0);
        assert_eq!(p.status, TargetStatus::Active);
    }

    #[test]
    fn test_window_bounds_inclusive_days() {
        let (from, until) = window_bounds(date("2026-03-01"), date("2026-03-31"));
        assert_eq!(from.to_rfc3339(), "2026-03-01T00:00:00+00:00");
        assert_eq!(until.to_rfc3339(), "2026-04-01T00:00:00+00:00");
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(TargetStatus::Achieved.to_string(), "achieved");
        assert_eq!("expired".parse::<TargetStatus>().unwrap(), TargetStatus::Expired);
    }
}
