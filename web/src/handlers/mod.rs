//! HTTP request handlers.

pub mod health;
pub mod login;
pub mod logout;

pub use health::{health_check, readiness};
pub use login::{login_form, login_submit, me};
pub use logout::logout;
