//! 销售团队与成员

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::checks::{ensure_unique_in_branch, ensure_unreferenced, ensure_user_in_branch};
use super::targets::update_progress;
use crate::access::{
    Action, BranchScoped, RequestContext, Resource, find_scoped, resolve_branch_for_create,
};
use crate::errors::{CrmError, Result};
use crate::services::{Page, Pagination, double_option, fetch_page, like_pattern};
use crate::utils::validation;
use migration::entities::crm::{lead, target, team, team_member, user};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub search: Option<String>,
    pub leader_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTeam {
    pub name: String,
    pub description: Option<String>,
    pub leader_id: Option<i32>,
    #[serde(default)]
    pub members: Vec<i32>,
    pub branch_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTeam {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub leader_id: Option<Option<i32>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddMember {
    pub user_id: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamMember {
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamDetail {
    #[serde(flatten)]
    pub team: team::Model,
    pub members: Vec<TeamMember>,
}

pub async fn list(ctx: &RequestContext, query: TeamQuery) -> Result<Page<team::Model>> {
    ctx.authorize(Resource::Teams, Action::View)?;

    let mut select = team::Entity::scoped(ctx);
    if let Some(pattern) = like_pattern(query.search.as_deref()) {
        select = select.filter(team::Column::Name.like(pattern));
    }
    if let Some(leader_id) = query.leader_id {
        select = select.filter(team::Column::LeaderId.eq(leader_id));
    }

    fetch_page(
        select.order_by_desc(team::Column::CreatedAt),
        &ctx.db,
        Pagination::new(query.page, query.page_size),
    )
    .await
}

pub async fn get(ctx: &RequestContext, id: i32) -> Result<TeamDetail> {
    ctx.authorize(Resource::Teams, Action::View)?;

    let team = find_scoped::<team::Entity>(id, ctx).await?;
    let members = members_of(&ctx.db, id).await?;
    Ok(TeamDetail { team, members })
}

pub async fn create(ctx: &RequestContext, input: CreateTeam) -> Result<TeamDetail> {
    ctx.authorize(Resource::Teams, Action::Create)?;

    let name = validation::required_text("name", &input.name, 120)?;
    let branch_id = resolve_branch_for_create(ctx, input.branch_id).await?;
    ensure_unique_in_branch::<team::Entity>(ctx, branch_id, team::Column::Name, &name, None)
        .await?;
    if let Some(leader_id) = input.leader_id {
        ensure_user_in_branch(&ctx.db, "Leader", leader_id, branch_id).await?;
    }
    let members: BTreeSet<i32> = input.members.into_iter().collect();
    for user_id in &members {
        ensure_user_in_branch(&ctx.db, "Member", *user_id, branch_id).await?;
    }

    let now = Utc::now();
    let txn = ctx.db.begin().await?;
    let created = team::ActiveModel {
        module_id: Set(ctx.module_id),
        branch_id: Set(branch_id),
        name: Set(name),
        description: Set(validation::optional_text(
            "description",
            input.description.as_deref(),
            2000,
        )?),
        leader_id: Set(input.leader_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for user_id in members {
        team_member::ActiveModel {
            team_id: Set(created.id),
            user_id: Set(user_id),
            joined_at: Set(now),
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;

    info!("Team {} created by user {}", created.id, ctx.user_id);
    let members = members_of(&ctx.db, created.id).await?;
    Ok(TeamDetail {
        team: created,
        members,
    })
}

pub async fn update(ctx: &RequestContext, id: i32, input: UpdateTeam) -> Result<team::Model> {
    ctx.authorize(Resource::Teams, Action::Update)?;

    let existing = find_scoped::<team::Entity>(id, ctx).await?;
    let branch_id = existing.branch_id;
    let mut model = existing.into_active_model();

    if let Some(name) = input.name {
        let name = validation::required_text("name", &name, 120)?;
        ensure_unique_in_branch::<team::Entity>(
            ctx,
            branch_id,
            team::Column::Name,
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
    if let Some(leader_id) = input.leader_id {
        if let Some(leader_id) = leader_id {
            ensure_user_in_branch(&ctx.db, "Leader", leader_id, branch_id).await?;
        }
        model.leader_id = Set(leader_id);
    }

    model.updated_at = Set(Utc::now());
    Ok(model.update(&ctx.db).await?)
}

/// 删除团队及其成员关系；仍有团队目标时拒绝，线索上的团队引用清空
pub async fn delete(ctx: &RequestContext, id: i32) -> Result<()> {
    ctx.authorize(Resource::Teams, Action::Delete)?;

    let existing = find_scoped::<team::Entity>(id, ctx).await?;
    ensure_unreferenced::<target::Entity, _>(
        &ctx.db,
        target::Column::TeamId,
        id,
        &format!("Team {}", id),
        "targets",
    )
    .await?;

    let txn = ctx.db.begin().await?;
    lead::Entity::update_many()
        .col_expr(lead::Column::TeamId, Expr::value(Option::<i32>::None))
        .filter(lead::Column::TeamId.eq(id))
        .exec(&txn)
        .await?;
    team_member::Entity::delete_many()
        .filter(team_member::Column::TeamId.eq(id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;
    txn.commit().await?;

    info!("Team {} deleted by user {}", id, ctx.user_id);
    Ok(())
}

pub async fn add_member(ctx: &RequestContext, id: i32, input: AddMember) -> Result<TeamDetail> {
    ctx.authorize(Resource::Teams, Action::Update)?;

    let team = find_scoped::<team::Entity>(id, ctx).await?;
    ensure_user_in_branch(&ctx.db, "Member", input.user_id, team.branch_id).await?;

    let already = team_member::Entity::find_by_id((id, input.user_id))
        .count(&ctx.db)
        .await?;
    if already > 0 {
        return Err(CrmError::conflict(format!(
            "User {} is already a member of team {}",
            input.user_id, id
        )));
    }

    let txn = ctx.db.begin().await?;
    team_member::ActiveModel {
        team_id: Set(id),
        user_id: Set(input.user_id),
        joined_at: Set(Utc::now()),
    }
    .insert(&txn)
    .await?;
    refresh_team_targets(&txn, id).await?;
    txn.commit().await?;

    info!("User {} joined team {}", input.user_id, id);
    let members = members_of(&ctx.db, id).await?;
    Ok(TeamDetail { team, members })
}

pub async fn remove_member(ctx: &RequestContext, id: i32, user_id: i32) -> Result<()> {
    ctx.authorize(Resource::Teams, Action::Update)?;

    find_scoped::<team::Entity>(id, ctx).await?;

    let txn = ctx.db.begin().await?;
    let result = team_member::Entity::delete_by_id((id, user_id))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(CrmError::not_found(format!(
            "User {} is not a member of team {}",
            user_id, id
        )));
    }
    refresh_team_targets(&txn, id).await?;
    txn.commit().await?;

    info!("User {} left team {}", user_id, id);
    Ok(())
}

async fn members_of<C: ConnectionTrait>(db: &C, team_id: i32) -> Result<Vec<TeamMember>> {
    let memberships = team_member::Entity::find()
        .filter(team_member::Column::TeamId.eq(team_id))
        .order_by_asc(team_member::Column::JoinedAt)
        .all(db)
        .await?;
    if memberships.is_empty() {
        return Ok(Vec::new());
    }

    let users: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(memberships.iter().map(|m| m.user_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(memberships
        .into_iter()
        .filter_map(|m| {
            users.get(&m.user_id).map(|u| TeamMember {
                user_id: m.user_id,
                name: u.name.clone(),
                email: u.email.clone(),
                joined_at: m.joined_at,
            })
        })
        .collect())
}

/// 成员变化会影响团队目标
pub(crate) async fn refresh_team_targets<C: ConnectionTrait>(db: &C, team_id: i32) -> Result<()> {
    let targets = target::Entity::find()
        .filter(target::Column::TeamId.eq(team_id))
        .all(db)
        .await?;
    for t in targets {
        update_progress(db, t).await?;
    }
    Ok(())
}
