pub mod auth;
pub mod introspect;
