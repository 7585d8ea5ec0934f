//! 组织端点：分支、用户、模块

use actix_web::{Responder, Result as ActixResult, web};

use super::helpers::{api_result, created_result, message_result, paginated_result};
use crate::access::RequestContext;
use crate::services::org::{
    self, BranchQuery, CreateBranch, CreateUser, UpdateBranch, UpdateUser, UserQuery,
};

pub async fn list_branches(
    ctx: RequestContext,
    query: web::Query<BranchQuery>,
) -> ActixResult<impl Responder> {
    Ok(paginated_result(
        org::list_branches(&ctx, query.into_inner()).await,
    ))
}

pub async fn get_branch(ctx: RequestContext, id: web::Path<i32>) -> ActixResult<impl Responder> {
    Ok(api_result(org::get_branch(&ctx, id.into_inner()).await))
}

pub async fn create_branch(
    ctx: RequestContext,
    body: web::Json<CreateBranch>,
) -> ActixResult<impl Responder> {
    Ok(created_result(
        org::create_branch(&ctx, body.into_inner()).await,
    ))
}

pub async fn update_branch(
    ctx: RequestContext,
    id: web::Path<i32>,
    body: web::Json<UpdateBranch>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        org::update_branch(&ctx, id.into_inner(), body.into_inner()).await,
    ))
}

pub async fn delete_branch(
    ctx: RequestContext,
    id: web::Path<i32>,
) -> ActixResult<impl Responder> {
    Ok(message_result(
        org::delete_branch(&ctx, id.into_inner()).await,
        "Branch deleted",
    ))
}

pub async fn list_users(
    ctx: RequestContext,
    query: web::Query<UserQuery>,
) -> ActixResult<impl Responder> {
    Ok(paginated_result(org::list_users(&ctx, query.into_inner()).await))
}

pub async fn get_user(ctx: RequestContext, id: web::Path<i32>) -> ActixResult<impl Responder> {
    Ok(api_result(org::get_user(&ctx, id.into_inner()).await))
}

pub async fn create_user(
    ctx: RequestContext,
    body: web::Json<CreateUser>,
) -> ActixResult<impl Responder> {
    Ok(created_result(org::create_user(&ctx, body.into_inner()).await))
}

pub async fn update_user(
    ctx: RequestContext,
    id: web::Path<i32>,
    body: web::Json<UpdateUser>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        org::update_user(&ctx, id.into_inner(), body.into_inner()).await,
    ))
}

pub async fn delete_user(ctx: RequestContext, id: web::Path<i32>) -> ActixResult<impl Responder> {
    Ok(message_result(
        org::delete_user(&ctx, id.into_inner()).await,
        "User deleted",
    ))
}

/// `GET /modules` 当前租户启用的模块
pub async fn list_modules(ctx: RequestContext) -> ActixResult<impl Responder> {
    Ok(api_result(org::list_modules(&ctx).await))
}

pub fn org_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/branches")
            .route("", web::get().to(list_branches))
            .route("", web::post().to(create_branch))
            .route("/{id}", web::get().to(get_branch))
            .route("/{id}", web::put().to(update_branch))
            .route("/{id}", web::delete().to(delete_branch)),
    )
    .service(
        web::scope("/users")
            .route("", web::get().to(list_users))
            .route("", web::post().to(create_user))
            .route("/{id}", web::get().to(get_user))
            .route("/{id}", web::put().to(update_user))
            .route("/{id}", web::delete().to(delete_user)),
    )
    .route("/modules", web::get().to(list_modules));
}
