mod claims;
pub mod credentials;
pub mod jwt;

pub use credentials::ServiceAccountKey;
pub use jwt::{fetch_access_token, AccessToken};
