//! 产品目录端点：分类、单位、供应商、产品、服务
//!
//! 五类资源的端点形状一致，由 `catalog_resource!` 生成。

use actix_web::{Responder, Result as ActixResult, web};

use super::helpers::{api_result, created_result, message_result, paginated_result};
use crate::access::RequestContext;
use crate::services::catalog::{categories, offerings, products, units, vendors};

macro_rules! catalog_resource {
    ($name:ident, $path:literal, $service:ident, $query:ty, $create:ty, $update:ty, $deleted:literal) => {
        pub mod $name {
            use super::*;

            pub async fn list(
                ctx: RequestContext,
                query: web::Query<$query>,
            ) -> ActixResult<impl Responder> {
                Ok(paginated_result($service::list(&ctx, query.into_inner()).await))
            }

            pub async fn get(ctx: RequestContext, id: web::Path<i32>) -> ActixResult<impl Responder> {
                Ok(api_result($service::get(&ctx, id.into_inner()).await))
            }

            pub async fn create(
                ctx: RequestContext,
                body: web::Json<$create>,
            ) -> ActixResult<impl Responder> {
                Ok(created_result($service::create(&ctx, body.into_inner()).await))
            }

            pub async fn update(
                ctx: RequestContext,
                id: web::Path<i32>,
                body: web::Json<$update>,
            ) -> ActixResult<impl Responder> {
                Ok(api_result(
                    $service::update(&ctx, id.into_inner(), body.into_inner()).await,
                ))
            }

            pub async fn delete(
                ctx: RequestContext,
                id: web::Path<i32>,
            ) -> ActixResult<impl Responder> {
                Ok(message_result(
                    $service::delete(&ctx, id.into_inner()).await,
                    $deleted,
                ))
            }

            pub fn routes() -> actix_web::Scope {
                web::scope($path)
                    .route("", web::get().to(list))
                    .route("", web::post().to(create))
                    .route("/{id}", web::get().to(get))
                    .route("/{id}", web::put().to(update))
                    .route("/{id}", web::delete().to(delete))
            }
        }
    };
}

catalog_resource!(
    category,
    "/categories",
    categories,
    categories::CategoryQuery,
    categories::CreateCategory,
    categories::UpdateCategory,
    "Category deleted"
);
catalog_resource!(
    unit,
    "/units",
    units,
    units::UnitQuery,
    units::CreateUnit,
    units::UpdateUnit,
    "Unit deleted"
);
catalog_resource!(
    vendor,
    "/vendors",
    vendors,
    vendors::VendorQuery,
    vendors::CreateVendor,
    vendors::UpdateVendor,
    "Vendor deleted"
);
catalog_resource!(
    product,
    "/products",
    products,
    products::ProductQuery,
    products::CreateProduct,
    products::UpdateProduct,
    "Product deleted"
);
catalog_resource!(
    offering,
    "/services",
    offerings,
    offerings::OfferingQuery,
    offerings::CreateOffering,
    offerings::UpdateOffering,
    "Service deleted"
);

/// 目录下的全部资源
pub fn catalog_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(category::routes())
        .service(unit::routes())
        .service(vendor::routes())
        .service(product::routes())
        .service(offering::routes());
}
