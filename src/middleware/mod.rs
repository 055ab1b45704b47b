pub mod auth;
pub mod response;

pub use auth::{external_base_url, validate_jwt, Claims};
pub use response::{quoted_etag, ResourceResponse};
