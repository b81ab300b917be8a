//! OAuth provider construction.
//!
//! Builds configured provider instances for domain controllers. Providers are
//! constructed once at startup and injected into the handler layer; nothing
//! here lives in a package-level global.

pub mod dingtalk;
pub mod feishu;
