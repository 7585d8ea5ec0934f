//! 销售端点：线索、团队、目标

use actix_web::{HttpResponse, Responder, Result as ActixResult, web};
use chrono::Utc;
use tracing::info;

use super::helpers::{api_result, created_result, error_from_crm, message_result, paginated_result};
use crate::access::RequestContext;
use crate::services::leads::{self, ChangeStatus, CreateLead, LeadQuery, UpdateLead};
use crate::services::targets::{self, CreateTarget, TargetQuery, UpdateTarget};
use crate::services::teams::{self, AddMember, CreateTeam, TeamQuery, UpdateTeam};

// ============ Leads ============

pub async fn list_leads(
    ctx: RequestContext,
    query: web::Query<LeadQuery>,
) -> ActixResult<impl Responder> {
    Ok(paginated_result(leads::list(&ctx, query.into_inner()).await))
}

/// `GET /leads/export` 按当前筛选条件导出 CSV
pub async fn export_leads(
    ctx: RequestContext,
    query: web::Query<LeadQuery>,
) -> ActixResult<impl Responder> {
    let body = match leads::export_csv(&ctx, query.into_inner()).await {
        Ok(body) => body,
        Err(e) => return Ok(error_from_crm(&e)),
    };

    let filename = format!(
        "leads_{}_{}.csv",
        ctx.tenant.subdomain,
        Utc::now().format("%Y%m%d_%H%M%S")
    );
    info!("Exported {} bytes of leads to {}", body.len(), filename);

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(body))
}

pub async fn get_lead(ctx: RequestContext, id: web::Path<i32>) -> ActixResult<impl Responder> {
    Ok(api_result(leads::get(&ctx, id.into_inner()).await))
}

pub async fn create_lead(
    ctx: RequestContext,
    body: web::Json<CreateLead>,
) -> ActixResult<impl Responder> {
    Ok(created_result(leads::create(&ctx, body.into_inner()).await))
}

pub async fn update_lead(
    ctx: RequestContext,
    id: web::Path<i32>,
    body: web::Json<UpdateLead>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        leads::update(&ctx, id.into_inner(), body.into_inner()).await,
    ))
}

pub async fn change_lead_status(
    ctx: RequestContext,
    id: web::Path<i32>,
    body: web::Json<ChangeStatus>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        leads::change_status(&ctx, id.into_inner(), body.into_inner()).await,
    ))
}

pub async fn delete_lead(ctx: RequestContext, id: web::Path<i32>) -> ActixResult<impl Responder> {
    Ok(message_result(
        leads::delete(&ctx, id.into_inner()).await,
        "Lead deleted",
    ))
}

// ============ Teams ============

pub async fn list_teams(
    ctx: RequestContext,
    query: web::Query<TeamQuery>,
) -> ActixResult<impl Responder> {
    Ok(paginated_result(teams::list(&ctx, query.into_inner()).await))
}

pub async fn get_team(ctx: RequestContext, id: web::Path<i32>) -> ActixResult<impl Responder> {
    Ok(api_result(teams::get(&ctx, id.into_inner()).await))
}

pub async fn create_team(
    ctx: RequestContext,
    body: web::Json<CreateTeam>,
) -> ActixResult<impl Responder> {
    Ok(created_result(teams::create(&ctx, body.into_inner()).await))
}

pub async fn update_team(
    ctx: RequestContext,
    id: web::Path<i32>,
    body: web::Json<UpdateTeam>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        teams::update(&ctx, id.into_inner(), body.into_inner()).await,
    ))
}

pub async fn delete_team(ctx: RequestContext, id: web::Path<i32>) -> ActixResult<impl Responder> {
    Ok(message_result(
        teams::delete(&ctx, id.into_inner()).await,
        "Team deleted",
    ))
}

pub async fn add_team_member(
    ctx: RequestContext,
    id: web::Path<i32>,
    body: web::Json<AddMember>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        teams::add_member(&ctx, id.into_inner(), body.into_inner()).await,
    ))
}

pub async fn remove_team_member(
    ctx: RequestContext,
    path: web::Path<(i32, i32)>,
) -> ActixResult<impl Responder> {
    let (team_id, user_id) = path.into_inner();
    Ok(message_result(
        teams::remove_member(&ctx, team_id, user_id).await,
        "Member removed",
    ))
}

// ============ Targets ============

pub async fn list_targets(
    ctx: RequestContext,
    query: web::Query<TargetQuery>,
) -> ActixResult<impl Responder> {
    Ok(paginated_result(targets::list(&ctx, query.into_inner()).await))
}

pub async fn get_target(ctx: RequestContext, id: web::Path<i32>) -> ActixResult<impl Responder> {
    Ok(api_result(targets::get(&ctx, id.into_inner()).await))
}

pub async fn create_target(
    ctx: RequestContext,
    body: web::Json<CreateTarget>,
) -> ActixResult<impl Responder> {
    Ok(created_result(targets::create(&ctx, body.into_inner()).await))
}

pub async fn update_target(
    ctx: RequestContext,
    id: web::Path<i32>,
    body: web::Json<UpdateTarget>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        targets::update(&ctx, id.into_inner(), body.into_inner()).await,
    ))
}

pub async fn refresh_target(
    ctx: RequestContext,
    id: web::Path<i32>,
) -> ActixResult<impl Responder> {
    Ok(api_result(targets::refresh(&ctx, id.into_inner()).await))
}

pub async fn delete_target(ctx: RequestContext, id: web::Path<i32>) -> ActixResult<impl Responder> {
    Ok(message_result(
        targets::delete(&ctx, id.into_inner()).await,
        "Target deleted",
    ))
}

pub fn sales_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/leads")
            .route("", web::get().to(list_leads))
            .route("", web::post().to(create_lead))
            // 必须在 /{id} 之前
            .route("/export", web::get().to(export_leads))
            .route("/{id}", web::get().to(get_lead))
            .route("/{id}", web::put().to(update_lead))
            .route("/{id}", web::delete().to(delete_lead))
            .route("/{id}/status", web::patch().to(change_lead_status)),
    )
    .service(
        web::scope("/teams")
            .route("", web::get().to(list_teams))
            .route("", web::post().to(create_team))
            .route("/{id}", web::get().to(get_team))
            .route("/{id}", web::put().to(update_team))
            .route("/{id}", web::delete().to(delete_team))
            .route("/{id}/members", web::post().to(add_team_member))
            .route("/{id}/members/{user_id}", web::delete().to(remove_team_member)),
    )
    .service(
        web::scope("/targets")
            .route("", web::get().to(list_targets))
            .route("", web::post().to(create_target))
            .route("/{id}", web::get().to(get_target))
            .route("/{id}", web::put().to(update_target))
            .route("/{id}", web::delete().to(delete_target))
            .route("/{id}/refresh", web::post().to(refresh_target)),
    );
}
