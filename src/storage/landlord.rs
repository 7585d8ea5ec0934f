//! landlord 库：租户元数据
//!
//! 所有读写都经过 `with_retry`，landlord 库短暂不可用时不会直接让注册失败。

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::{debug, info};

use super::backend::{RetryConfig, with_retry};
use super::models::{NewTenant, Tenant, TenantFilter, TenantStatus};
use crate::errors::{CrmError, Result};
use migration::entities::landlord::tenant;

#[derive(Clone)]
pub struct LandlordStore {
    db: DatabaseConnection,
    retry_config: RetryConfig,
}

impl LandlordStore {
    pub fn new(db: DatabaseConnection, retry_config: RetryConfig) -> Self {
        Self { db, retry_config }
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn ping(&self) -> Result<()> {
        self.db.ping().await.map_err(CrmError::from)
    }

    /// 写入 pending 状态的租户行
    pub async fn insert_pending(&self, new_tenant: NewTenant) -> Result<Tenant> {
        let now = Utc::now();
        let model = tenant::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(new_tenant.name),
            subdomain: Set(new_tenant.subdomain),
            database_name: Set(new_tenant.database_name),
            status: Set(TenantStatus::Pending.to_string()),
            owner_email: Set(new_tenant.owner_email),
            failure_reason: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            provisioned_at: Set(None),
        };

        let inserted = model.insert(&self.db).await?;
        info!(
            "Tenant '{}' registered as pending ({})",
            inserted.subdomain, inserted.id
        );
        Ok(inserted.into())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Tenant>> {
        let db = &self.db;
        let id_owned = id.to_string();

        let model = with_retry(&format!("find_tenant({})", id), self.retry_config, || async {
            tenant::Entity::find_by_id(id_owned.clone()).one(db).await
        })
        .await?;

        Ok(model.map(Tenant::from))
    }

    pub async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>> {
        let db = &self.db;
        let subdomain_owned = subdomain.to_string();

        let model = with_retry(
            &format!("find_tenant_by_subdomain({})", subdomain),
            self.retry_config,
            || async {
                tenant::Entity::find()
                    .filter(tenant::Column::Subdomain.eq(subdomain_owned.as_str()))
                    .one(db)
                    .await
            },
        )
        .await?;

        Ok(model.map(Tenant::from))
    }

    /// 按 id 或子域名查找（CLI 和 landlord API 都接受两种写法）
    pub async fn find_by_key(&self, key: &str) -> Result<Option<Tenant>> {
        match self.find_by_id(key).await? {
            Some(tenant) => Ok(Some(tenant)),
            None => self.find_by_subdomain(key).await,
        }
    }

    pub async fn subdomain_taken(&self, subdomain: &str) -> Result<bool> {
        let count = tenant::Entity::find()
            .filter(tenant::Column::Subdomain.eq(subdomain))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// 分页列出租户，最新的在前；返回 (当前页, 总数)
    pub async fn list(
        &self,
        filter: &TenantFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<Tenant>, u64)> {
        let mut condition = Condition::all();

        if let Some(status) = filter.status {
            condition = condition.add(tenant::Column::Status.eq(status.to_string()));
        }

        if let Some(ref search) = filter.search {
            condition = condition.add(
                Condition::any()
                    .add(tenant::Column::Name.contains(search))
                    .add(tenant::Column::Subdomain.contains(search)),
            );
        }

        let paginator = tenant::Entity::find()
            .filter(condition)
            .order_by_desc(tenant::Column::CreatedAt)
            .paginate(&self.db, page_size.max(1));

        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page.saturating_sub(1)).await?;

        debug!("Listed {} tenants (total {})", models.len(), total);
        Ok((models.into_iter().map(Tenant::from).collect(), total))
    }

    pub async fn list_all(&self) -> Result<Vec<Tenant>> {
        let models = tenant::Entity::find()
            .order_by_asc(tenant::Column::Subdomain)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Tenant::from).collect())
    }

    /// 更新状态；`reason` 只在 failed 时有意义，其余状态会清空
    pub async fn set_status(
        &self,
        id: &str,
        status: TenantStatus,
        reason: Option<String>,
    ) -> Result<Tenant> {
        let model = tenant::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| CrmError::not_found(format!("Tenant '{}' not found", id)))?;

        let mut active: tenant::ActiveModel = model.into();
        active.status = Set(status.to_string());
        active.failure_reason = Set(reason);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await?;
        info!("Tenant '{}' is now {}", updated.subdomain, status);
        Ok(updated.into())
    }

    pub async fn mark_active(&self, id: &str) -> Result<Tenant> {
        let model = tenant::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| CrmError::not_found(format!("Tenant '{}' not found", id)))?;

        let now = Utc::now();
        let mut active: tenant::ActiveModel = model.into();
        active.status = Set(TenantStatus::Active.to_string());
        active.failure_reason = Set(None);
        active.updated_at = Set(now);
        active.provisioned_at = Set(Some(now));

        let updated = active.update(&self.db).await?;
        info!("Tenant '{}' provisioned", updated.subdomain);
        Ok(updated.into())
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = tenant::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
