use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

const CACHE_NO_STORE: &str = "no-store";
const HX_RETARGET_HEADER: &str = "HX-Retarget";
const HX_RESWAP_HEADER: &str = "HX-Reswap";
const HX_TRIGGER_HEADER: &str = "HX-Trigger";

pub fn is_hx_request(headers: &HeaderMap) -> bool {
    headers
        .get("hx-request")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn fragment_response(fragment_html: String, http_status: StatusCode) -> Response {
    (
        http_status,
        [
            (CONTENT_TYPE, "text/html; charset=utf-8"),
            (CACHE_CONTROL, CACHE_NO_STORE),
        ],
        fragment_html,
    )
        .into_response()
}

/// Points the swap at a different element than the requesting form targeted.
pub fn set_retarget_header(response: &mut Response, selector: &str) {
    if let Ok(value) = HeaderValue::from_str(selector) {
        response.headers_mut().insert(HX_RETARGET_HEADER, value);
    }
}

pub fn set_reswap_header(response: &mut Response, strategy: &str) {
    if let Ok(value) = HeaderValue::from_str(strategy) {
        response.headers_mut().insert(HX_RESWAP_HEADER, value);
    }
}

pub fn set_trigger_header(response: &mut Response, event: &str) {
    if let Ok(value) = HeaderValue::from_str(event) {
        response.headers_mut().insert(HX_TRIGGER_HEADER, value);
    }
}
