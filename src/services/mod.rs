// Services layer - Business logic and orchestration
pub mod auth_service;
pub mod policy;
pub mod token_service;
pub mod validators;

pub use auth_service::AuthService;
pub use policy::{authorize, decide, Action, Decision, ResourceKind};
pub use token_service::TokenService;
