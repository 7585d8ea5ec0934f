//! 租户开通
//!
//! 注册流程：校验 → landlord 写入 pending → provisioning → 建库 → 迁移 → 初始化数据 → active。
//! 建库之后任何一步失败都会回收：关闭连接、删库、landlord 标记 failed。

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashSet;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use tracing::{error, info, warn};

use super::TenantDatabases;
use super::naming::{database_name_for, validate_subdomain};
use crate::access::Role;
use crate::config::TenancyConfig;
use crate::errors::{CrmError, Result};
use crate::storage::backend::run_tenant_migrations;
use crate::storage::{LandlordStore, NewTenant, Tenant, TenantConnections, TenantStatus};
use crate::utils::password::hash_new_password;
use crate::utils::validation;
use migration::entities::crm::{branch, module, role, user};

pub const DEFAULT_BRANCH_NAME: &str = "Head Office";
pub const DEFAULT_BRANCH_CODE: &str = "HQ";
pub const DEFAULT_MODULE_NAME: &str = "Sales";
pub const DEFAULT_MODULE_SLUG: &str = "sales";

/// 注册请求（公司信息 + 首个管理员）
#[derive(Debug, Clone)]
pub struct RegisterTenant {
    pub company_name: String,
    pub subdomain: String,
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password: String,
}

/// 校验后的管理员账号，密码已哈希
struct AdminAccount {
    name: String,
    email: String,
    password_hash: String,
}

/// 同一子域名的并发注册只放行一个
struct InFlightGuard<'a> {
    set: &'a DashSet<String>,
    key: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a DashSet<String>, key: &str) -> Option<Self> {
        set.insert(key.to_string()).then(|| Self {
            set,
            key: key.to_string(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.key);
    }
}

pub struct Provisioner {
    landlord: Arc<LandlordStore>,
    connections: Arc<TenantConnections>,
    in_flight: DashSet<String>,
    database_prefix: String,
}

impl Provisioner {
    pub fn new(
        landlord: Arc<LandlordStore>,
        connections: Arc<TenantConnections>,
        tenancy: &TenancyConfig,
    ) -> Self {
        Self {
            landlord,
            connections,
            in_flight: DashSet::new(),
            database_prefix: tenancy.database_prefix.clone(),
        }
    }

    /// 注册并开通租户，成功时返回 active 状态的租户
    pub async fn register(&self, request: RegisterTenant) -> Result<Tenant> {
        let company_name = validation::required_text("company_name", &request.company_name, 120)?;
        let subdomain = validate_subdomain(&request.subdomain)?;
        let admin = AdminAccount {
            name: validation::required_text("admin_name", &request.admin_name, 120)?,
            email: validation::email("admin_email", &request.admin_email)?,
            password_hash: hash_new_password(&request.admin_password)?,
        };

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, &subdomain) else {
            return Err(CrmError::conflict(format!(
                "Registration for '{}' is already in progress",
                subdomain
            )));
        };

        if self.landlord.subdomain_taken(&subdomain).await? {
            return Err(CrmError::conflict(format!(
                "Subdomain '{}' is already registered",
                subdomain
            )));
        }

        let tenant = self
            .landlord
            .insert_pending(NewTenant {
                name: company_name,
                database_name: database_name_for(&self.database_prefix, &subdomain),
                subdomain,
                owner_email: admin.email.clone(),
            })
            .await?;

        let tenant = self
            .landlord
            .set_status(&tenant.id, TenantStatus::Provisioning, None)
            .await?;

        let databases = self.connections.databases();
        if let Err(e) = databases
            .create(self.landlord.get_db(), &tenant.database_name)
            .await
        {
            // 库未建成，不删除
            self.mark_failed(&tenant, &e, false).await;
            return Err(CrmError::provisioning(format!(
                "Failed to create database for '{}': {}",
                tenant.subdomain,
                e.message()
            )));
        }

        if let Err(e) = self.prepare_database(&tenant, &admin).await {
            self.mark_failed(&tenant, &e, true).await;
            return Err(CrmError::provisioning(format!(
                "Failed to provision '{}': {}",
                tenant.subdomain,
                e.message()
            )));
        }

        let tenant = self.landlord.mark_active(&tenant.id).await?;
        info!(
            "Tenant '{}' ({}) is ready",
            tenant.subdomain, tenant.database_name
        );
        Ok(tenant)
    }

    /// 迁移 + 初始化数据；连接用完即关，失败回收时 SQLite 文件才能删除
    async fn prepare_database(&self, tenant: &Tenant, admin: &AdminAccount) -> Result<()> {
        let db = self
            .connections
            .connect_uncached(&tenant.database_name)
            .await?;

        let outcome = async {
            run_tenant_migrations(&db).await?;
            seed_tenant(&db, admin).await
        }
        .await;

        if let Err(e) = db.close().await {
            warn!(
                "Failed to close provisioning connection for '{}': {}",
                tenant.subdomain, e
            );
        }
        outcome
    }

    async fn mark_failed(&self, tenant: &Tenant, cause: &CrmError, drop_database: bool) {
        error!(
            "Provisioning of tenant '{}' failed: {}",
            tenant.subdomain, cause
        );

        self.connections.evict(&tenant.id).await;

        if drop_database
            && let Err(e) = TenantDatabases::drop(
                self.connections.databases(),
                self.landlord.get_db(),
                &tenant.database_name,
            )
            .await
        {
            error!(
                "Cleanup: failed to drop database '{}': {}",
                tenant.database_name, e
            );
        }

        if let Err(e) = self
            .landlord
            .set_status(
                &tenant.id,
                TenantStatus::Failed,
                Some(cause.message().to_string()),
            )
            .await
        {
            error!(
                "Cleanup: failed to mark tenant '{}' as failed: {}",
                tenant.subdomain, e
            );
        }
    }

    /// 重新执行租户库迁移（升级后使用）
    pub async fn migrate_tenant(&self, tenant: &Tenant) -> Result<()> {
        if !matches!(
            tenant.status,
            TenantStatus::Active | TenantStatus::Suspended
        ) {
            return Err(CrmError::validation(format!(
                "Tenant '{}' is {}, only provisioned tenants can be migrated",
                tenant.subdomain, tenant.status
            )));
        }

        let db = self.connections.get_or_connect(tenant).await?;
        run_tenant_migrations(&db).await?;
        info!("Tenant '{}' migrated", tenant.subdomain);
        Ok(())
    }

    /// 删除租户库和 landlord 记录
    pub async fn deprovision(&self, key: &str) -> Result<Tenant> {
        let tenant = self.find(key).await?;

        self.connections.evict(&tenant.id).await;
        TenantDatabases::drop(
            self.connections.databases(),
            self.landlord.get_db(),
            &tenant.database_name,
        )
        .await?;
        self.landlord.delete(&tenant.id).await?;

        warn!("Tenant '{}' deprovisioned", tenant.subdomain);
        Ok(tenant)
    }

    /// active ⇄ suspended
    pub async fn set_suspended(&self, key: &str, suspended: bool) -> Result<Tenant> {
        let tenant = self.find(key).await?;

        let (from, to) = if suspended {
            (TenantStatus::Active, TenantStatus::Suspended)
        } else {
            (TenantStatus::Suspended, TenantStatus::Active)
        };

        if tenant.status == to {
            return Ok(tenant);
        }
        if tenant.status != from {
            return Err(CrmError::conflict(format!(
                "Tenant '{}' is {}, cannot change it to {}",
                tenant.subdomain, tenant.status, to
            )));
        }

        if suspended {
            self.connections.evict(&tenant.id).await;
        }
        self.landlord.set_status(&tenant.id, to, None).await
    }

    async fn find(&self, key: &str) -> Result<Tenant> {
        self.landlord
            .find_by_key(key)
            .await?
            .ok_or_else(|| CrmError::not_found(format!("Tenant '{}' not found", key)))
    }
}

/// 初始化角色、默认分支、默认模块和管理员（单个事务）
async fn seed_tenant(db: &DatabaseConnection, admin: &AdminAccount) -> Result<()> {
    let txn = db.begin().await?;
    let now = Utc::now();

    let mut admin_role_id = None;
    for role in Role::ALL {
        let inserted = role::ActiveModel {
            name: Set(role.as_ref().to_string()),
            description: Set(Some(role.description().to_string())),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        if role == Role::Admin {
            admin_role_id = Some(inserted.id);
        }
    }
    let admin_role_id =
        admin_role_id.ok_or_else(|| CrmError::internal("Admin role was not seeded"))?;

    branch::ActiveModel {
        name: Set(DEFAULT_BRANCH_NAME.to_string()),
        code: Set(DEFAULT_BRANCH_CODE.to_string()),
        address: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    module::ActiveModel {
        name: Set(DEFAULT_MODULE_NAME.to_string()),
        slug: Set(DEFAULT_MODULE_SLUG.to_string()),
        is_active: Set(true),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    user::ActiveModel {
        name: Set(admin.name.clone()),
        email: Set(admin.email.clone()),
        password_hash: Set(admin.password_hash.clone()),
        role_id: Set(admin_role_id),
        branch_id: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(())
}
