//! HTTP API 集成测试
//!
//! 覆盖注册、登录、角色权限、分支隔离、目录约束、删除规则、线索与目标进度。

#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use common::{ADMIN_EMAIL, ADMIN_PASSWORD, LANDLORD_TOKEN, TestEnv, peer};
use salesdesk::storage::TenantStatus;

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

fn get(uri: &str, token: &str) -> TestRequest {
    TestRequest::get()
        .uri(uri)
        .insert_header(("X-Tenant", "acme"))
        .insert_header(bearer(token))
}

fn post(uri: &str, token: &str, body: Value) -> TestRequest {
    TestRequest::post()
        .uri(uri)
        .insert_header(("X-Tenant", "acme"))
        .insert_header(bearer(token))
        .set_json(body)
}

fn put(uri: &str, token: &str, body: Value) -> TestRequest {
    TestRequest::put()
        .uri(uri)
        .insert_header(("X-Tenant", "acme"))
        .insert_header(bearer(token))
        .set_json(body)
}

fn delete(uri: &str, token: &str) -> TestRequest {
    TestRequest::delete()
        .uri(uri)
        .insert_header(("X-Tenant", "acme"))
        .insert_header(bearer(token))
}

fn id_of(body: &Value) -> i64 {
    body["data"]["id"].as_i64().expect("id missing")
}

#[tokio::test]
async fn test_health_endpoints() {
    let env = TestEnv::new().await;
    let app = test_app!(env);

    let (status, body) = call_json!(app, TestRequest::get().uri("/health"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["checks"]["landlord"]["backend"], "sqlite");

    let resp = test::call_service(&app, TestRequest::get().uri("/health/live").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_register_login_and_me() {
    let env = TestEnv::new().await;
    let app = test_app!(env);

    let (status, body) = call_json!(
        app,
        TestRequest::post()
            .uri("/api/v1/register")
            .peer_addr(peer(1))
            .set_json(json!({
                "company_name": "Acme Ltd",
                "subdomain": "acme",
                "admin_name": "Owner",
                "admin_email": ADMIN_EMAIL,
                "admin_password": ADMIN_PASSWORD,
            }))
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "active");

    // 同一子域名再次注册
    let (status, body) = call_json!(
        app,
        TestRequest::post()
            .uri("/api/v1/register")
            .peer_addr(peer(2))
            .set_json(json!({
                "company_name": "Other",
                "subdomain": "acme",
                "admin_name": "Owner",
                "admin_email": "x@other.io",
                "admin_password": ADMIN_PASSWORD,
            }))
    );
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 4001);

    let (status, body) = call_json!(
        app,
        TestRequest::post()
            .uri("/api/v1/auth/login")
            .peer_addr(peer(3))
            .insert_header(("X-Tenant", "acme"))
            .set_json(json!({ "email": ADMIN_EMAIL, "password": "wrong-password" }))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2000);
    assert_eq!(body["message"], "Invalid email or password");

    let token = login!(app, "acme", ADMIN_EMAIL, ADMIN_PASSWORD, peer(4));

    let (status, body) = call_json!(app, get("/api/v1/auth/me", &token));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], ADMIN_EMAIL);
    assert_eq!(body["data"]["role"], "admin");
    assert!(body["data"].get("password_hash").is_none());

    let (status, _) = call_json!(
        app,
        TestRequest::get()
            .uri("/api/v1/auth/me")
            .insert_header(("X-Tenant", "acme"))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // token 不能用于其他租户
    env.register("globex").await;
    let (status, _) = call_json!(
        app,
        TestRequest::get()
            .uri("/api/v1/leads")
            .insert_header(("X-Tenant", "globex"))
            .insert_header(bearer(&token))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_issues_new_access_token() {
    let env = TestEnv::new().await;
    env.register("acme").await;
    let app = test_app!(env);

    let (status, body) = call_json!(
        app,
        TestRequest::post()
            .uri("/api/v1/auth/login")
            .peer_addr(peer(1))
            .insert_header(("X-Tenant", "acme"))
            .set_json(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
    );
    assert_eq!(status, StatusCode::OK);
    let refresh_token = body["data"]["refresh_token"].as_str().unwrap().to_string();
    let access_token = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, body) = call_json!(
        app,
        TestRequest::post()
            .uri("/api/v1/auth/refresh")
            .peer_addr(peer(2))
            .insert_header(("X-Tenant", "acme"))
            .set_json(json!({ "refresh_token": refresh_token }))
    );
    assert_eq!(status, StatusCode::OK, "{body}");
    let renewed = body["data"]["access_token"].as_str().unwrap();
    let (status, _) = call_json!(app, get("/api/v1/auth/me", renewed));
    assert_eq!(status, StatusCode::OK);

    // access token 不能当 refresh token 使用
    let (status, _) = call_json!(
        app,
        TestRequest::post()
            .uri("/api/v1/auth/refresh")
            .peer_addr(peer(3))
            .insert_header(("X-Tenant", "acme"))
            .set_json(json!({ "refresh_token": access_token }))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_product_and_lead_lifecycle() {
    let env = TestEnv::new().await;
    env.register("acme").await;
    let app = test_app!(env);
    let token = login!(app, "acme", ADMIN_EMAIL, ADMIN_PASSWORD, peer(1));

    let (status, body) = call_json!(
        app,
        post(
            "/api/v1/products",
            &token,
            json!({ "name": "Widget", "sku": " wd-1 ", "price": 10.5, "branch_id": 1 })
        )
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["sku"], "WD-1");
    let product_id = id_of(&body);

    let (status, _) = call_json!(
        app,
        post(
            "/api/v1/products",
            &token,
            json!({ "name": "Widget 2", "sku": "WD-1", "branch_id": 1 })
        )
    );
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call_json!(
        app,
        post(
            "/api/v1/products",
            &token,
            json!({ "name": "Broken", "sku": "BR-1", "price": -1, "branch_id": 1 })
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1001);

    let (status, body) = call_json!(
        app,
        post(
            "/api/v1/leads",
            &token,
            json!({
                "name": "Initech deal",
                "email": "Buyer@Initech.com",
                "value": 1200.0,
                "product_id": product_id,
                "branch_id": 1,
            })
        )
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "new");
    assert!(body["data"]["closed_at"].is_null());
    let lead_id = id_of(&body);

    let (status, body) = call_json!(app, get("/api/v1/leads?status=new", &token));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["name"], "Initech deal");

    let (status, body) = call_json!(
        app,
        TestRequest::patch()
            .uri(&format!("/api/v1/leads/{}/status", lead_id))
            .insert_header(("X-Tenant", "acme"))
            .insert_header(bearer(&token))
            .set_json(json!({ "status": "won" }))
    );
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "won");
    assert!(!body["data"]["closed_at"].is_null());

    let resp = test::call_service(&app, get("/api/v1/leads/export", &token).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp
        .headers()
        .get("Content-Type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/csv"));
    assert!(resp.headers().contains_key("Content-Disposition"));
    let csv = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(csv.lines().count() >= 2);
    assert!(csv.contains("Initech deal"));

    let (status, _) = call_json!(app, get("/api/v1/leads/not-a-number", &token));
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call_json!(
        app,
        TestRequest::delete()
            .uri(&format!("/api/v1/leads/{}", lead_id))
            .insert_header(("X-Tenant", "acme"))
            .insert_header(bearer(&token))
    );
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call_json!(app, get(&format!("/api/v1/leads/{}", lead_id), &token));
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_executive_permissions() {
    let env = TestEnv::new().await;
    env.register("acme").await;
    let app = test_app!(env);
    let admin = login!(app, "acme", ADMIN_EMAIL, ADMIN_PASSWORD, peer(1));

    let (status, body) = call_json!(
        app,
        post(
            "/api/v1/users",
            &admin,
            json!({
                "name": "Eve",
                "email": "eve@acme.io",
                "password": "executive-pass",
                "role": "executive",
                "branch_id": 1,
            })
        )
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["role"], "executive");
    let eve_id = id_of(&body);

    let (status, _) = call_json!(
        app,
        post(
            "/api/v1/leads",
            &admin,
            json!({ "name": "Unassigned", "branch_id": 1 })
        )
    );
    assert_eq!(status, StatusCode::CREATED);

    let eve = login!(app, "acme", "eve@acme.io", "executive-pass", peer(2));

    // 只能看到分配给自己的线索
    let (status, body) = call_json!(app, get("/api/v1/leads", &eve));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 0);

    let (status, body) = call_json!(
        app,
        post("/api/v1/leads", &eve, json!({ "name": "My lead", "value": 50 }))
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["assigned_to"], eve_id);
    assert_eq!(body["data"]["branch_id"], 1);
    let lead_id = id_of(&body);

    let (status, body) = call_json!(
        app,
        TestRequest::delete()
            .uri(&format!("/api/v1/leads/{}", lead_id))
            .insert_header(("X-Tenant", "acme"))
            .insert_header(bearer(&eve))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2003);

    let (status, _) = call_json!(app, get("/api/v1/users", &eve));
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call_json!(
        app,
        post("/api/v1/products", &eve, json!({ "name": "Nope", "sku": "NO-1" }))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call_json!(app, get("/api/v1/modules", &eve));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_branch_bound_user_is_isolated() {
    let env = TestEnv::new().await;
    env.register("acme").await;
    let app = test_app!(env);
    let admin = login!(app, "acme", ADMIN_EMAIL, ADMIN_PASSWORD, peer(1));

    let (status, body) = call_json!(
        app,
        post(
            "/api/v1/branches",
            &admin,
            json!({ "name": "North", "code": "n1" })
        )
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["code"], "N1");
    let north = id_of(&body);

    let (status, _) = call_json!(
        app,
        post(
            "/api/v1/users",
            &admin,
            json!({
                "name": "Max",
                "email": "max@acme.io",
                "password": "manager-pass",
                "role": "manager",
                "branch_id": north,
            })
        )
    );
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call_json!(
        app,
        post(
            "/api/v1/products",
            &admin,
            json!({ "name": "HQ only", "sku": "HQ-1" })
        )
        .insert_header(("X-Branch-Id", "1"))
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let hq_product = id_of(&body);

    let max = login!(app, "acme", "max@acme.io", "manager-pass", peer(2));

    let (status, body) = call_json!(app, get("/api/v1/products", &max));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 0);

    let (status, _) = call_json!(
        app,
        get(&format!("/api/v1/products/{}", hq_product), &max)
    );
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call_json!(
        app,
        get("/api/v1/products", &max).insert_header(("X-Branch-Id", "1"))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call_json!(app, get("/api/v1/branches", &max));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["id"], north);

    // 管理员选择分支：无效值和不存在的分支
    let (status, _) = call_json!(
        app,
        get("/api/v1/products", &admin).insert_header(("X-Branch-Id", "abc"))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call_json!(
        app,
        get("/api/v1/products", &admin).insert_header(("X-Branch-Id", "99"))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 未选分支时管理员可以看到全部
    let (status, body) = call_json!(app, get("/api/v1/products", &admin));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_target_progress_follows_won_leads() {
    let env = TestEnv::new().await;
    env.register("acme").await;
    let app = test_app!(env);
    let admin = login!(app, "acme", ADMIN_EMAIL, ADMIN_PASSWORD, peer(1));

    let (status, body) = call_json!(
        app,
        post(
            "/api/v1/users",
            &admin,
            json!({
                "name": "Sam",
                "email": "sam@acme.io",
                "password": "executive-pass",
                "role": "executive",
                "branch_id": 1,
            })
        )
    );
    assert_eq!(status, StatusCode::CREATED);
    let sam = id_of(&body);

    let today = Utc::now().date_naive();
    let (status, body) = call_json!(
        app,
        post(
            "/api/v1/targets",
            &admin,
            json!({
                "title": "Q target",
                "user_id": sam,
                "target_amount": 1000.0,
                "start_date": (today - Duration::days(1)).to_string(),
                "end_date": (today + Duration::days(30)).to_string(),
                "branch_id": 1,
            })
        )
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "active");
    assert_eq!(body["data"]["progress"], 0.0);
    let target_id = id_of(&body);

    let (status, _) = call_json!(
        app,
        post(
            "/api/v1/leads",
            &admin,
            json!({
                "name": "First win",
                "value": 250.0,
                "status": "won",
                "assigned_to": sam,
                "branch_id": 1,
            })
        )
    );
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = call_json!(app, get(&format!("/api/v1/targets/{}", target_id), &admin));
    assert_eq!(body["data"]["achieved_amount"], 250.0);
    assert_eq!(body["data"]["progress"], 25.0);
    assert_eq!(body["data"]["status"], "active");

    let (status, body) = call_json!(
        app,
        post(
            "/api/v1/leads",
            &admin,
            json!({
                "name": "Big win",
                "value": 800.0,
                "status": "won",
                "assigned_to": sam,
                "branch_id": 1,
            })
        )
    );
    assert_eq!(status, StatusCode::CREATED);
    let big_win = id_of(&body);

    let (_, body) = call_json!(app, get(&format!("/api/v1/targets/{}", target_id), &admin));
    assert_eq!(body["data"]["achieved_amount"], 1050.0);
    assert_eq!(body["data"]["progress"], 100.0);
    assert_eq!(body["data"]["status"], "achieved");

    let (status, _) = call_json!(
        app,
        TestRequest::patch()
            .uri(&format!("/api/v1/leads/{}/status", big_win))
            .insert_header(("X-Tenant", "acme"))
            .insert_header(bearer(&admin))
            .set_json(json!({ "status": "lost" }))
    );
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call_json!(
        app,
        post(
            &format!("/api/v1/targets/{}/refresh", target_id),
            &admin,
            json!({})
        )
    );
    assert_eq!(body["data"]["achieved_amount"], 250.0);
    assert_eq!(body["data"]["progress"], 25.0);
    assert_eq!(body["data"]["status"], "active");
}

#[tokio::test]
async fn test_team_membership() {
    let env = TestEnv::new().await;
    env.register("acme").await;
    let app = test_app!(env);
    let admin = login!(app, "acme", ADMIN_EMAIL, ADMIN_PASSWORD, peer(1));

    let (_, body) = call_json!(
        app,
        post(
            "/api/v1/users",
            &admin,
            json!({
                "name": "Tia",
                "email": "tia@acme.io",
                "password": "executive-pass",
                "role": "executive",
                "branch_id": 1,
            })
        )
    );
    let tia = id_of(&body);

    let (status, body) = call_json!(
        app,
        post(
            "/api/v1/teams",
            &admin,
            json!({ "name": "Hunters", "branch_id": 1 })
        )
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let team = id_of(&body);
    assert_eq!(body["data"]["members"].as_array().map(Vec::len), Some(0));

    let uri = format!("/api/v1/teams/{}/members", team);
    let (status, body) = call_json!(app, post(&uri, &admin, json!({ "user_id": tia })));
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["members"][0]["user_id"], tia);

    let (status, _) = call_json!(app, post(&uri, &admin, json!({ "user_id": tia })));
    assert_eq!(status, StatusCode::CONFLICT);

    let remove = format!("/api/v1/teams/{}/members/{}", team, tia);
    let (status, _) = call_json!(app, delete(&remove, &admin));
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call_json!(app, delete(&remove, &admin));
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_landlord_api() {
    let env = TestEnv::new().await;
    env.register("acme").await;
    let app = test_app!(env);

    let landlord = |req: TestRequest| req.insert_header(bearer(LANDLORD_TOKEN));

    let (status, _) = call_json!(app, TestRequest::get().uri("/api/v1/landlord/tenants"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call_json!(
        app,
        TestRequest::get()
            .uri("/api/v1/landlord/tenants")
            .insert_header(bearer("wrong"))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call_json!(
        app,
        landlord(TestRequest::get().uri("/api/v1/landlord/tenants?status=active"))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["subdomain"], "acme");

    let (status, body) = call_json!(
        app,
        landlord(TestRequest::post().uri("/api/v1/landlord/tenants/acme/suspend"))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "suspended");

    let (status, body) = call_json!(
        app,
        TestRequest::post()
            .uri("/api/v1/auth/login")
            .peer_addr(peer(1))
            .insert_header(("X-Tenant", "acme"))
            .set_json(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 3002);

    let (status, _) = call_json!(
        app,
        landlord(TestRequest::post().uri("/api/v1/landlord/tenants/acme/activate"))
    );
    assert_eq!(status, StatusCode::OK);
    login!(app, "acme", ADMIN_EMAIL, ADMIN_PASSWORD, peer(2));

    let (status, _) = call_json!(
        app,
        landlord(TestRequest::post().uri("/api/v1/landlord/tenants/acme/migrate"))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call_json!(
        app,
        landlord(TestRequest::delete().uri("/api/v1/landlord/tenants/acme"))
    );
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call_json!(
        app,
        landlord(TestRequest::get().uri("/api/v1/landlord/tenants/acme"))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn executive(name: &str, branch_id: i64) -> Value {
    json!({
        "name": name,
        "email": format!("{}@acme.io", name.to_lowercase()),
        "password": "executive-pass",
        "role": "executive",
        "branch_id": branch_id,
    })
}

fn open_target(title: &str, owner: (&str, i64)) -> Value {
    let today = Utc::now().date_naive();
    let mut body = json!({
        "title": title,
        "target_amount": 1000.0,
        "start_date": (today - Duration::days(1)).to_string(),
        "end_date": (today + Duration::days(30)).to_string(),
        "branch_id": 1,
    });
    body[owner.0] = json!(owner.1);
    body
}

#[tokio::test]
async fn test_catalog_field_rules() {
    let env = TestEnv::new().await;
    env.register("acme").await;
    let app = test_app!(env);
    let admin = login!(app, "acme", ADMIN_EMAIL, ADMIN_PASSWORD, peer(1));

    let (status, body) = call_json!(
        app,
        post("/api/v1/categories", &admin, json!({ "name": "Hardware", "branch_id": 1 }))
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let hardware = id_of(&body);

    let (status, body) = call_json!(
        app,
        post("/api/v1/categories", &admin, json!({ "name": "Hardware", "branch_id": 1 }))
    );
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 4001);

    let (status, body) = call_json!(
        app,
        put(
            &format!("/api/v1/categories/{}", hardware),
            &admin,
            json!({ "parent_id": hardware })
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1001);

    let (status, _) = call_json!(
        app,
        post(
            "/api/v1/units",
            &admin,
            json!({ "name": "Kilogram", "short_name": "kilograms-per-box", "branch_id": 1 })
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = call_json!(
        app,
        post(
            "/api/v1/units",
            &admin,
            json!({ "name": "Kilogram", "short_name": "kg", "branch_id": 1 })
        )
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let (status, _) = call_json!(
        app,
        post(
            "/api/v1/units",
            &admin,
            json!({ "name": "Kilo", "short_name": "kg", "branch_id": 1 })
        )
    );
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call_json!(
        app,
        post(
            "/api/v1/services",
            &admin,
            json!({ "name": "Install", "price": 20.0, "duration_minutes": 0, "branch_id": 1 })
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = call_json!(
        app,
        post(
            "/api/v1/services",
            &admin,
            json!({ "name": "Install", "price": 20.0, "duration_minutes": 45, "branch_id": 1 })
        )
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["duration_minutes"], 45);

    let (status, _) = call_json!(
        app,
        post(
            "/api/v1/vendors",
            &admin,
            json!({ "name": "Parts Co", "email": "not-an-email", "branch_id": 1 })
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 不存在的分支
    let (status, body) = call_json!(
        app,
        post(
            "/api/v1/products",
            &admin,
            json!({ "name": "Ghost", "sku": "GH-1", "branch_id": 999 })
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1001);
}

#[tokio::test]
async fn test_references_must_share_the_record_branch() {
    let env = TestEnv::new().await;
    env.register("acme").await;
    let app = test_app!(env);
    let admin = login!(app, "acme", ADMIN_EMAIL, ADMIN_PASSWORD, peer(1));

    let (_, body) = call_json!(
        app,
        post("/api/v1/branches", &admin, json!({ "name": "North", "code": "N1" }))
    );
    let north = id_of(&body);
    let (status, body) = call_json!(
        app,
        post("/api/v1/categories", &admin, json!({ "name": "Tools", "branch_id": north }))
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let north_category = id_of(&body);

    let (status, body) = call_json!(
        app,
        post(
            "/api/v1/products",
            &admin,
            json!({
                "name": "Drill",
                "sku": "DR-1",
                "category_id": north_category,
                "branch_id": 1,
            })
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (_, body) = call_json!(app, post("/api/v1/users", &admin, executive("Nia", north)));
    let nia = id_of(&body);
    let (status, _) = call_json!(
        app,
        post(
            "/api/v1/leads",
            &admin,
            json!({ "name": "Wrong branch", "assigned_to": nia, "branch_id": 1 })
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call_json!(
        app,
        post("/api/v1/targets", &admin, open_target("North quota", ("user_id", nia)))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call_json!(
        app,
        post(
            "/api/v1/products",
            &admin,
            json!({
                "name": "Drill",
                "sku": "DR-1",
                "category_id": north_category,
                "branch_id": north,
            })
        )
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

#[tokio::test]
async fn test_delete_refuses_referenced_rows() {
    let env = TestEnv::new().await;
    env.register("acme").await;
    let app = test_app!(env);
    let admin = login!(app, "acme", ADMIN_EMAIL, ADMIN_PASSWORD, peer(1));

    let (_, body) = call_json!(
        app,
        post("/api/v1/branches", &admin, json!({ "name": "South", "code": "S1" }))
    );
    let south = id_of(&body);

    let (_, body) = call_json!(
        app,
        post("/api/v1/categories", &admin, json!({ "name": "Parts", "branch_id": south }))
    );
    let category = id_of(&body);
    let (_, body) = call_json!(
        app,
        post(
            "/api/v1/categories",
            &admin,
            json!({ "name": "Bolts", "parent_id": category, "branch_id": south })
        )
    );
    let child = id_of(&body);
    let (_, body) = call_json!(
        app,
        post(
            "/api/v1/units",
            &admin,
            json!({ "name": "Piece", "short_name": "pc", "branch_id": south })
        )
    );
    let unit = id_of(&body);
    let (_, body) = call_json!(
        app,
        post("/api/v1/vendors", &admin, json!({ "name": "Bolt Inc", "branch_id": south }))
    );
    let vendor = id_of(&body);
    let (status, body) = call_json!(
        app,
        post(
            "/api/v1/products",
            &admin,
            json!({
                "name": "M8 bolt",
                "sku": "M8",
                "category_id": child,
                "unit_id": unit,
                "vendor_id": vendor,
                "branch_id": south,
            })
        )
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let product = id_of(&body);
    let (status, body) = call_json!(
        app,
        post(
            "/api/v1/leads",
            &admin,
            json!({ "name": "Bolt order", "product_id": product, "branch_id": south })
        )
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let lead = id_of(&body);

    for uri in [
        format!("/api/v1/categories/{}", category),
        format!("/api/v1/categories/{}", child),
        format!("/api/v1/units/{}", unit),
        format!("/api/v1/vendors/{}", vendor),
        format!("/api/v1/products/{}", product),
        format!("/api/v1/branches/{}", south),
    ] {
        let (status, body) = call_json!(app, delete(&uri, &admin));
        assert_eq!(status, StatusCode::CONFLICT, "{uri}: {body}");
        assert_eq!(body["code"], 4001);
    }

    // 自底向上删除后都能成功
    for uri in [
        format!("/api/v1/leads/{}", lead),
        format!("/api/v1/products/{}", product),
        format!("/api/v1/categories/{}", child),
        format!("/api/v1/categories/{}", category),
        format!("/api/v1/units/{}", unit),
        format!("/api/v1/vendors/{}", vendor),
        format!("/api/v1/branches/{}", south),
    ] {
        let (status, body) = call_json!(app, delete(&uri, &admin));
        assert_eq!(status, StatusCode::OK, "{uri}: {body}");
    }
}

#[tokio::test]
async fn test_delete_user_unassigns_leads_and_refreshes_targets() {
    let env = TestEnv::new().await;
    env.register("acme").await;
    let app = test_app!(env);
    let admin = login!(app, "acme", ADMIN_EMAIL, ADMIN_PASSWORD, peer(1));

    let (_, body) = call_json!(app, get("/api/v1/auth/me", &admin));
    let admin_id = id_of(&body);
    let (status, body) = call_json!(app, delete(&format!("/api/v1/users/{}", admin_id), &admin));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1001);

    let (_, body) = call_json!(app, post("/api/v1/users", &admin, executive("Sam", 1)));
    let sam = id_of(&body);
    let (_, body) = call_json!(
        app,
        post(
            "/api/v1/teams",
            &admin,
            json!({ "name": "Closers", "members": [sam], "branch_id": 1 })
        )
    );
    let team = id_of(&body);
    let (status, body) = call_json!(
        app,
        post("/api/v1/targets", &admin, open_target("Team quota", ("team_id", team)))
    );
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let target = id_of(&body);

    let (_, body) = call_json!(
        app,
        post(
            "/api/v1/leads",
            &admin,
            json!({
                "name": "Closed deal",
                "value": 400.0,
                "status": "won",
                "assigned_to": sam,
                "branch_id": 1,
            })
        )
    );
    let lead = id_of(&body);
    let (_, body) = call_json!(app, get(&format!("/api/v1/targets/{}", target), &admin));
    assert_eq!(body["data"]["achieved_amount"], 400.0);

    // 个人目标仍指向该用户时拒绝删除
    let (_, body) = call_json!(
        app,
        post("/api/v1/targets", &admin, open_target("Sam quota", ("user_id", sam)))
    );
    let personal = id_of(&body);
    let (status, body) = call_json!(app, delete(&format!("/api/v1/users/{}", sam), &admin));
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    let (status, _) = call_json!(app, delete(&format!("/api/v1/targets/{}", personal), &admin));
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call_json!(app, delete(&format!("/api/v1/users/{}", sam), &admin));
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, body) = call_json!(app, get(&format!("/api/v1/leads/{}", lead), &admin));
    assert!(body["data"]["assigned_to"].is_null());
    let (_, body) = call_json!(app, get(&format!("/api/v1/targets/{}", target), &admin));
    assert_eq!(body["data"]["achieved_amount"], 0.0);
    assert_eq!(body["data"]["progress"], 0.0);
    assert_eq!(body["data"]["status"], "active");
    let (_, body) = call_json!(app, get(&format!("/api/v1/teams/{}", team), &admin));
    assert_eq!(body["data"]["members"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_team_target_follows_membership() {
    let env = TestEnv::new().await;
    env.register("acme").await;
    let app = test_app!(env);
    let admin = login!(app, "acme", ADMIN_EMAIL, ADMIN_PASSWORD, peer(1));

    let (_, body) = call_json!(app, post("/api/v1/users", &admin, executive("Lee", 1)));
    let lee = id_of(&body);
    let (status, _) = call_json!(
        app,
        post(
            "/api/v1/leads",
            &admin,
            json!({
                "name": "Early win",
                "value": 300.0,
                "status": "won",
                "assigned_to": lee,
                "branch_id": 1,
            })
        )
    );
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = call_json!(
        app,
        post("/api/v1/teams", &admin, json!({ "name": "Field", "branch_id": 1 }))
    );
    let team = id_of(&body);
    let (_, body) = call_json!(
        app,
        post("/api/v1/targets", &admin, open_target("Field quota", ("team_id", team)))
    );
    let target = id_of(&body);
    assert_eq!(body["data"]["achieved_amount"], 0.0);

    let members = format!("/api/v1/teams/{}/members", team);
    let (status, _) = call_json!(app, post(&members, &admin, json!({ "user_id": lee })));
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call_json!(app, get(&format!("/api/v1/targets/{}", target), &admin));
    assert_eq!(body["data"]["achieved_amount"], 300.0);
    assert_eq!(body["data"]["progress"], 30.0);

    let (status, _) = call_json!(app, delete(&format!("{}/{}", members, lee), &admin));
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call_json!(app, get(&format!("/api/v1/targets/{}", target), &admin));
    assert_eq!(body["data"]["achieved_amount"], 0.0);

    // 有目标的团队不能删除
    let (status, body) = call_json!(app, delete(&format!("/api/v1/teams/{}", team), &admin));
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    let (status, _) = call_json!(app, delete(&format!("/api/v1/targets/{}", target), &admin));
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call_json!(app, delete(&format!("/api/v1/teams/{}", team), &admin));
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_list_clamps_page_size_and_matches_wildcards_literally() {
    let env = TestEnv::new().await;
    env.register("acme").await;
    let app = test_app!(env);
    let admin = login!(app, "acme", ADMIN_EMAIL, ADMIN_PASSWORD, peer(1));

    for name in ["Initech", "Umbrella"] {
        let (status, _) = call_json!(
            app,
            post("/api/v1/leads", &admin, json!({ "name": name, "branch_id": 1 }))
        );
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = call_json!(app, get("/api/v1/leads?page_size=500", &admin));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["page_size"], 100);
    assert_eq!(body["pagination"]["total"], 2);

    let (_, body) = call_json!(app, get("/api/v1/leads?search=nit", &admin));
    assert_eq!(body["pagination"]["total"], 1);
    let (_, body) = call_json!(app, get("/api/v1/leads?search=%25", &admin));
    assert_eq!(body["pagination"]["total"], 0);
    let (_, body) = call_json!(app, get("/api/v1/leads?search=_", &admin));
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_unprovisioned_tenant_is_unavailable() {
    let env = TestEnv::new().await;
    let tenant = env.register("acme").await;
    let app = test_app!(env);

    for (n, status) in [(1, TenantStatus::Pending), (2, TenantStatus::Failed)] {
        env.state
            .landlord
            .set_status(&tenant.id, status, None)
            .await
            .expect("更新租户状态失败");
        env.state.resolver.invalidate("acme").await;

        let (code, body) = call_json!(
            app,
            TestRequest::post()
                .uri("/api/v1/auth/login")
                .peer_addr(peer(n))
                .insert_header(("X-Tenant", "acme"))
                .set_json(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        );
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE, "{body}");
        assert_eq!(body["code"], 3001);
    }
}
