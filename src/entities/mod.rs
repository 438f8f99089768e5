pub mod audit_log;
pub mod product;
pub mod receivable;
pub mod return_product;
pub mod store;
pub mod user;
pub mod warehouse_distribution;
pub mod warehouse_product;
