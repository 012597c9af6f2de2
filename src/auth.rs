pub mod authority;
pub mod jwt;
pub mod locks;
pub mod tokens;
