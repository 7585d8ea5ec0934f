//! 租户用户登录与 token 刷新

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::org::UserView;
use crate::access::context::load_role;
use crate::api::jwt::{TokenSubject, get_jwt_service};
use crate::errors::{CrmError, Result};
use crate::storage::Tenant;
use crate::utils::password::{verify_dummy, verify_password};
use migration::entities::crm::{module, user};

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// 秒
    pub expires_in: u64,
    pub user: UserView,
    pub module_id: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

pub async fn login(
    tenant: &Tenant,
    db: &DatabaseConnection,
    request: LoginRequest,
) -> Result<TokenPair> {
    let email = request.email.trim().to_ascii_lowercase();
    let found = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?;

    // 用户不存在和密码错误返回同样的信息
    let Some(found) = found else {
        verify_dummy(&request.password);
        info!("Login failed for '{}' on tenant '{}'", email, tenant.subdomain);
        return Err(CrmError::unauthorized("Invalid email or password"));
    };
    if !verify_password(&request.password, &found.password_hash)? {
        info!("Login failed for '{}' on tenant '{}'", email, tenant.subdomain);
        return Err(CrmError::unauthorized("Invalid email or password"));
    }
    if !found.is_active {
        warn!("Inactive user {} tried to log in", found.id);
        return Err(CrmError::unauthorized("Account is disabled"));
    }

    let role = load_role(db, found.role_id).await?;
    let module_id = default_module(db).await?;

    let jwt = get_jwt_service();
    let access_token = jwt.generate_access_token(&TokenSubject {
        user_id: found.id,
        tenant_id: tenant.id.clone(),
        role,
        module_id,
        branch_id: found.branch_id,
    })?;
    let refresh_token = jwt.generate_refresh_token(found.id, &tenant.id)?;

    info!(
        "User {} logged in to tenant '{}' as {}",
        found.id, tenant.subdomain, role
    );
    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer",
        expires_in: jwt.access_token_minutes() * 60,
        user: UserView::new(found, role.as_ref()),
        module_id,
    })
}

/// 用 refresh token 换新的 access token，角色和分支重新从库里读取
pub async fn refresh(
    tenant: &Tenant,
    db: &DatabaseConnection,
    request: RefreshRequest,
) -> Result<AccessToken> {
    let jwt = get_jwt_service();
    let claims = jwt.validate_refresh_token(&request.refresh_token)?;
    if claims.tenant != tenant.id {
        return Err(CrmError::unauthorized("Token was issued for another tenant"));
    }

    let found = user::Entity::find_by_id(claims.user_id()?)
        .one(db)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| CrmError::unauthorized("User is inactive or no longer exists"))?;

    let access_token = jwt.generate_access_token(&TokenSubject {
        user_id: found.id,
        tenant_id: tenant.id.clone(),
        role: load_role(db, found.role_id).await?,
        module_id: default_module(db).await?,
        branch_id: found.branch_id,
    })?;

    Ok(AccessToken {
        access_token,
        token_type: "Bearer",
        expires_in: jwt.access_token_minutes() * 60,
    })
}

/// 登录后默认进入 id 最小的启用模块
async fn default_module(db: &DatabaseConnection) -> Result<i32> {
    module::Entity::find()
        .filter(module::Column::IsActive.eq(true))
        .order_by_asc(module::Column::Id)
        .one(db)
        .await?
        .map(|m| m.id)
        .ok_or_else(|| CrmError::forbidden("No active module is available for this tenant"))
}
