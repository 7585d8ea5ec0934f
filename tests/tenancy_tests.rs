//! 租户开通、状态切换与解析测试

#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::http::header::{HOST, HeaderMap, HeaderName, HeaderValue};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

use common::{ADMIN_EMAIL, ADMIN_PASSWORD, TestEnv};
use migration::entities::crm::{branch, module, role, user};
use salesdesk::errors::CrmError;
use salesdesk::storage::TenantStatus;
use salesdesk::tenancy::RegisterTenant;
use salesdesk::utils::password::verify_password;

fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.insert(
            HeaderName::from_static(name),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    map
}

fn request(subdomain: &str) -> RegisterTenant {
    RegisterTenant {
        company_name: "Acme Ltd".to_string(),
        subdomain: subdomain.to_string(),
        admin_name: "Owner".to_string(),
        admin_email: ADMIN_EMAIL.to_string(),
        admin_password: ADMIN_PASSWORD.to_string(),
    }
}

#[tokio::test]
async fn test_register_provisions_seeded_database() {
    let env = TestEnv::new().await;
    let tenant = env.register("acme").await;

    assert_eq!(tenant.status, TenantStatus::Active);
    assert_eq!(tenant.subdomain, "acme");
    assert_eq!(tenant.database_name, "tenant_acme");
    assert!(tenant.provisioned_at.is_some());
    assert!(env.tenant_file(&tenant.database_name).exists());

    let db = env
        .state
        .connections
        .get_or_connect(&tenant)
        .await
        .unwrap();

    let roles: Vec<String> = role::Entity::find()
        .order_by_asc(role::Column::Id)
        .all(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(roles, vec!["admin", "manager", "executive"]);

    assert_eq!(branch::Entity::find().count(&db).await.unwrap(), 1);
    assert_eq!(
        module::Entity::find()
            .filter(module::Column::IsActive.eq(true))
            .count(&db)
            .await
            .unwrap(),
        1
    );

    let admin = user::Entity::find()
        .filter(user::Column::Email.eq(ADMIN_EMAIL))
        .one(&db)
        .await
        .unwrap()
        .expect("admin user seeded");
    assert!(admin.is_active);
    assert!(admin.branch_id.is_none());
    assert_ne!(admin.password_hash, ADMIN_PASSWORD);
    assert!(verify_password(ADMIN_PASSWORD, &admin.password_hash).unwrap());
}

#[tokio::test]
async fn test_register_rejects_taken_and_reserved_subdomains() {
    let env = TestEnv::new().await;
    env.register("acme").await;

    let err = env
        .state
        .provisioner
        .register(request("ACME"))
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::Conflict(_)), "{err:?}");

    let err = env
        .state
        .provisioner
        .register(request("admin"))
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::Validation(_)), "{err:?}");

    let mut weak = request("globex");
    weak.admin_password = "short".to_string();
    let err = env.state.provisioner.register(weak).await.unwrap_err();
    assert!(matches!(err, CrmError::Validation(_)), "{err:?}");
    assert!(
        env.state
            .landlord
            .find_by_subdomain("globex")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_failed_provisioning_marks_tenant_failed() {
    let env = TestEnv::new().await;

    // 租户库文件已存在：建库失败，已有文件不能被删除
    let existing = env.tenant_file("tenant_beta");
    std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
    std::fs::write(&existing, b"not a database").unwrap();

    let err = env
        .state
        .provisioner
        .register(request("beta"))
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::Provisioning(_)), "{err:?}");

    let tenant = env
        .state
        .landlord
        .find_by_subdomain("beta")
        .await
        .unwrap()
        .expect("landlord row kept");
    assert_eq!(tenant.status, TenantStatus::Failed);
    assert!(tenant.failure_reason.is_some());
    assert_eq!(std::fs::read(&existing).unwrap(), b"not a database");

    let err = env
        .state
        .resolver
        .resolve(&headers(&[("x-tenant", "beta")]))
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_resolver_header_and_host() {
    let env = TestEnv::new().await;
    let tenant = env.register("acme").await;

    let by_header = env
        .state
        .resolver
        .resolve(&headers(&[("x-tenant", " Acme ")]))
        .await
        .unwrap();
    assert_eq!(by_header.id, tenant.id);

    let mut by_host = HeaderMap::new();
    by_host.insert(HOST, HeaderValue::from_static("acme.localhost:8080"));
    assert_eq!(
        env.state.resolver.resolve(&by_host).await.unwrap().id,
        tenant.id
    );

    let err = env
        .state
        .resolver
        .resolve(&headers(&[("x-tenant", "nobody")]))
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::NotFound(_)));

    let err = env.state.resolver.resolve(&HeaderMap::new()).await.unwrap_err();
    assert!(matches!(err, CrmError::Validation(_)));
}

#[tokio::test]
async fn test_suspend_activate_and_deprovision() {
    let env = TestEnv::new().await;
    let tenant = env.register("acme").await;
    let key = headers(&[("x-tenant", "acme")]);

    let suspended = env
        .state
        .provisioner
        .set_suspended("acme", true)
        .await
        .unwrap();
    assert_eq!(suspended.status, TenantStatus::Suspended);
    env.state.resolver.invalidate("acme").await;

    let err = env.state.resolver.resolve(&key).await.unwrap_err();
    assert_eq!(err.http_status(), StatusCode::FORBIDDEN);

    // 重复挂起是幂等的
    let again = env
        .state
        .provisioner
        .set_suspended(&tenant.id, true)
        .await
        .unwrap();
    assert_eq!(again.status, TenantStatus::Suspended);

    env.state
        .provisioner
        .set_suspended("acme", false)
        .await
        .unwrap();
    env.state.resolver.invalidate("acme").await;
    assert!(env.state.resolver.resolve(&key).await.is_ok());

    let removed = env.state.provisioner.deprovision("acme").await.unwrap();
    assert_eq!(removed.id, tenant.id);
    assert!(!env.tenant_file(&tenant.database_name).exists());
    assert!(
        env.state
            .landlord
            .find_by_id(&tenant.id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_migrate_tenant_is_repeatable() {
    let env = TestEnv::new().await;
    let tenant = env.register("acme").await;

    env.state.provisioner.migrate_tenant(&tenant).await.unwrap();
    env.state.provisioner.migrate_tenant(&tenant).await.unwrap();

    let db = env
        .state
        .connections
        .get_or_connect(&tenant)
        .await
        .unwrap();
    assert_eq!(role::Entity::find().count(&db).await.unwrap(), 3);
}
