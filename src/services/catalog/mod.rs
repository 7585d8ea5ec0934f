//! 商品目录：分类、单位、供应商、商品、服务项目

pub mod categories;
pub mod offerings;
pub mod products;
pub mod units;
pub mod vendors;
