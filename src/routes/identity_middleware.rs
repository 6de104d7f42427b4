use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

/// Header the hosting application sets after authenticating the caller
pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity of the caller of an HTTP route
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurrentUser(pub i32);

pub fn user_from_headers(headers: &HeaderMap) -> Result<i32, String> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| format!("Missing {} header", USER_ID_HEADER))?
        .to_str()
        .map_err(|_| format!("Invalid {} header", USER_ID_HEADER))?;
    raw.trim()
        .parse::<i32>()
        .map_err(|_| format!("Invalid user id '{}'", raw))
}

pub async fn identity_middleware(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let user_id = match user_from_headers(req.headers()) {
        Ok(user_id) => user_id,
        Err(e) => {
            warn!("Rejected request to {}: {}", req.uri().path(), e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    debug!("Request to {} by user {}", req.uri().path(), user_id);
    req.extensions_mut().insert(CurrentUser(user_id));
    Ok(next.run(req).await)
}
