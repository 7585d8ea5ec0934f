//! 请求上下文：租户、用户、角色、模块、分支
//!
//! 由 `TenantAuth` 中间件构造并放入 request extensions，handler 通过提取器获取。

use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures_util::future::{Ready, ready};
use sea_orm::{DatabaseConnection, EntityTrait};
use tracing::debug;

use super::policy::{Action, Resource, Role};
use crate::errors::{CrmError, Result};
use crate::storage::Tenant;
use migration::entities::crm::{branch, module, role, user};

#[derive(Clone)]
pub struct RequestContext {
    pub tenant: Tenant,
    pub db: DatabaseConnection,
    pub user_id: i32,
    pub role: Role,
    /// 用户绑定的分支；None 表示可访问全部分支
    pub user_branch: Option<i32>,
    pub module_id: i32,
    /// 当前请求作用的分支；None 表示全部分支
    pub branch_id: Option<i32>,
}

/// 中间件解析出的原始选择（token + 请求头）
#[derive(Debug, Clone, Copy)]
pub struct ScopeSelection {
    pub user_id: i32,
    pub token_module: i32,
    pub header_module: Option<i32>,
    pub header_branch: Option<i32>,
}

impl RequestContext {
    /// 校验用户、模块和分支后构造上下文
    ///
    /// 角色和分支以租户库中的用户记录为准，token 里的值只作参考
    pub async fn establish(
        tenant: Tenant,
        db: DatabaseConnection,
        selection: ScopeSelection,
    ) -> Result<Self> {
        let user = user::Entity::find_by_id(selection.user_id)
            .one(&db)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| CrmError::unauthorized("User is inactive or no longer exists"))?;

        let role = load_role(&db, user.role_id).await?;

        let module_id = selection.header_module.unwrap_or(selection.token_module);
        let module = module::Entity::find_by_id(module_id).one(&db).await?;
        if !module.is_some_and(|m| m.is_active) {
            return Err(CrmError::validation(format!(
                "Module {} does not exist or is inactive",
                module_id
            )));
        }

        let branch_id = match (user.branch_id, selection.header_branch) {
            (Some(own), Some(requested)) if own != requested => {
                return Err(CrmError::forbidden(format!(
                    "You can only access branch {}",
                    own
                )));
            }
            (Some(own), _) => Some(own),
            (None, Some(requested)) => {
                let branch = branch::Entity::find_by_id(requested).one(&db).await?;
                if !branch.is_some_and(|b| b.is_active) {
                    return Err(CrmError::validation(format!(
                        "Branch {} does not exist or is inactive",
                        requested
                    )));
                }
                Some(requested)
            }
            (None, None) => None,
        };

        debug!(
            "Request context: tenant={} user={} role={} module={} branch={:?}",
            tenant.subdomain, user.id, role, module_id, branch_id
        );

        Ok(Self {
            tenant,
            db,
            user_id: user.id,
            role,
            user_branch: user.branch_id,
            module_id,
            branch_id,
        })
    }

    /// 角色检查，拒绝时返回 Forbidden
    pub fn authorize(&self, resource: Resource, action: Action) -> Result<()> {
        if self.role.allows(resource, action) {
            Ok(())
        } else {
            Err(CrmError::forbidden(format!(
                "Role '{}' cannot {} {}",
                self.role, action, resource
            )))
        }
    }

    pub fn is_branch_bound(&self) -> bool {
        self.user_branch.is_some()
    }
}

pub async fn load_role(db: &DatabaseConnection, role_id: i32) -> Result<Role> {
    let role = role::Entity::find_by_id(role_id)
        .one(db)
        .await?
        .ok_or_else(|| CrmError::unauthorized("User role no longer exists"))?;

    role.name
        .parse()
        .map_err(|_| CrmError::forbidden(format!("Unknown role '{}'", role.name)))
}

impl FromRequest for RequestContext {
    type Error = CrmError;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<RequestContext>()
                .cloned()
                .ok_or_else(|| CrmError::unauthorized("Authentication required")),
        )
    }
}
