pub mod cors;
pub mod error_handler;
pub mod request_id;

pub use cors::setup_cors;
pub use error_handler::{ApiError, ApiResult, ErrorHandler};
pub use request_id::{extract_request_id, RequestId};
