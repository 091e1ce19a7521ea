pub mod accounts;
pub mod admin_auth;
pub mod audit;
pub mod email;
pub mod metrics;
pub mod roles;
pub mod sessions;
