use serde::{Deserialize, Serialize};

/// 统一的 JSON 响应包装
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResult<T: Serialize> {
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<T>,
}

impl<T: Serialize> ApiResult<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            error_message: None,
            content: Some(data),
        }
    }

    pub fn error(code: i32, message: &str) -> Self {
        Self {
            code,
            error_message: Some(message.to_string()),
            content: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_result_omits_content() {
        let body = serde_json::to_value(ApiResult::<()>::error(1005, "slow down")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "code": 1005, "error_message": "slow down" })
        );
    }

    #[test]
    fn success_result_omits_error_message() {
        let body = serde_json::to_value(ApiResult::success(3u64)).unwrap();
        assert_eq!(body, serde_json::json!({ "code": 0, "content": 3 }));
    }
}
