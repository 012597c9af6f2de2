pub mod confirmation_code;
pub mod jwt;
pub mod refresh_token;
