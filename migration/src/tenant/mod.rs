pub mod m20260301_000001_organization;
pub mod m20260301_000002_catalog;
pub mod m20260301_000003_sales;
