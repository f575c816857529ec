pub mod auth;
pub mod locale;

pub use auth::{AuthLayer, AuthenticatedAdmin};
