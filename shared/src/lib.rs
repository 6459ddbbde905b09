pub mod admin_service;
pub mod config;
pub mod headers;
pub mod http;
pub mod metrics_defs;
pub mod prefer;
pub mod record;
