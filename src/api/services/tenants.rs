//! 租户注册（公开）与 landlord 管理端点

use actix_web::{Responder, Result as ActixResult, web};
use tracing::{info, trace};

use super::helpers::{api_result, created_result, error_from_crm, paginated_response};
use super::types::{RegisterRequest, TenantListQuery};
use crate::api::state::AppState;
use crate::errors::{CrmError, Result};
use crate::services::{Page, Pagination};
use crate::storage::{Tenant, TenantFilter};
use crate::tenancy::RegisterTenant;

/// `POST /api/v1/register`
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> ActixResult<impl Responder> {
    let body = body.into_inner();
    info!("Registration request for subdomain '{}'", body.subdomain);

    let result = state
        .provisioner
        .register(RegisterTenant {
            company_name: body.company_name,
            subdomain: body.subdomain,
            admin_name: body.admin_name,
            admin_email: body.admin_email,
            admin_password: body.admin_password,
        })
        .await;
    Ok(created_result(result))
}

/// `GET /api/v1/landlord/tenants`
pub async fn list_tenants(
    state: web::Data<AppState>,
    query: web::Query<TenantListQuery>,
) -> ActixResult<impl Responder> {
    trace!("Landlord API: list tenants {:?}", query);
    let query = query.into_inner();
    let pagination = Pagination::new(query.page, query.page_size);

    let filter = TenantFilter {
        status: query.status,
        search: query.search,
    };
    let result = state
        .landlord
        .list(&filter, pagination.page, pagination.page_size)
        .await;

    Ok(match result {
        Ok((items, total)) => paginated_response(Page {
            items,
            page: pagination.page,
            page_size: pagination.page_size,
            total,
            total_pages: total.div_ceil(pagination.page_size),
        }),
        Err(e) => error_from_crm(&e),
    })
}

/// `GET /api/v1/landlord/tenants/{id}`（id 或子域名）
pub async fn get_tenant(
    state: web::Data<AppState>,
    key: web::Path<String>,
) -> ActixResult<impl Responder> {
    Ok(api_result(find_tenant(&state, &key).await))
}

pub async fn suspend_tenant(
    state: web::Data<AppState>,
    key: web::Path<String>,
) -> ActixResult<impl Responder> {
    let result = state.provisioner.set_suspended(&key, true).await;
    invalidate(&state, &result).await;
    Ok(api_result(result))
}

pub async fn activate_tenant(
    state: web::Data<AppState>,
    key: web::Path<String>,
) -> ActixResult<impl Responder> {
    let result = state.provisioner.set_suspended(&key, false).await;
    invalidate(&state, &result).await;
    Ok(api_result(result))
}

pub async fn migrate_tenant(
    state: web::Data<AppState>,
    key: web::Path<String>,
) -> ActixResult<impl Responder> {
    let result = async {
        let tenant = find_tenant(&state, &key).await?;
        state.provisioner.migrate_tenant(&tenant).await?;
        Ok::<_, CrmError>(tenant)
    }
    .await;
    Ok(api_result(result))
}

pub async fn delete_tenant(
    state: web::Data<AppState>,
    key: web::Path<String>,
) -> ActixResult<impl Responder> {
    let result = state.provisioner.deprovision(&key).await;
    invalidate(&state, &result).await;
    Ok(api_result(result))
}

async fn find_tenant(state: &AppState, key: &str) -> Result<Tenant> {
    state
        .landlord
        .find_by_key(key)
        .await?
        .ok_or_else(|| CrmError::not_found(format!("Tenant '{}' not found", key)))
}

/// 状态变化后清掉解析缓存
async fn invalidate(state: &AppState, result: &Result<Tenant>) {
    if let Ok(tenant) = result {
        state.resolver.invalidate(&tenant.subdomain).await;
    }
}

/// landlord 路由 `/landlord/tenants`
pub fn landlord_routes() -> actix_web::Scope {
    web::scope("/tenants")
        .route("", web::get().to(list_tenants))
        .route("/{id}/suspend", web::post().to(suspend_tenant))
        .route("/{id}/activate", web::post().to(activate_tenant))
        .route("/{id}/migrate", web::post().to(migrate_tenant))
        .route("/{id}", web::get().to(get_tenant))
        .route("/{id}", web::delete().to(delete_tenant))
}
