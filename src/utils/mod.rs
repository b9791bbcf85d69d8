use axum::Json;
use serde::Serialize;

use crate::result::ApiResult;

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResult<T>> {
    Json(ApiResult::success(data))
}

pub fn error_to_api_response<T: Serialize>(code: i32, msg: String) -> Json<ApiResult<T>> {
    Json(ApiResult::error(code, &msg))
}

pub mod error_codes {
    pub const RATE_LIMIT: i32 = 1005;
    pub const ADMISSION_TIMEOUT: i32 = 1006;
    pub const INTERNAL_ERROR: i32 = 5000;
}
