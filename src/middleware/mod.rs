pub mod auth;
pub mod extract;
pub mod json;
pub mod response;
pub mod upload;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use extract::{Path, Query};
pub use json::JsonBody;
pub use response::{ApiResponse, ApiResult};
pub use upload::UploadForm;
