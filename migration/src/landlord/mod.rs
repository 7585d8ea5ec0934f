pub mod m20260301_000001_tenants;
