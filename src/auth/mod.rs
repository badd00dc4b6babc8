pub mod extract;
pub mod session;
pub mod token;

pub use extract::AuthenticatedOperator;
pub use session::{
    AuthError, LoginRequest, LoginResponse, RegisterRequest, SessionAuthority, SessionConfig,
};
pub use token::Claims;
