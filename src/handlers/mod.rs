pub mod auth;
pub mod distributions;
pub mod notifications;
pub mod receivables;
pub mod returns;
pub mod stores;
