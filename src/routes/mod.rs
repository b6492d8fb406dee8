pub mod auth;
pub mod dashboard;
pub mod flash;
pub mod health_check;
pub mod subscription;
pub mod upgrade;
