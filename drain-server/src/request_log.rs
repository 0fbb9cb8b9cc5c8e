use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tracing::{info, warn};

/// Dumps every request (request line, headers and body) before handing it to the
/// wrapped handler. The body is buffered up to `max_body_bytes`; anything larger is
/// answered with 413 without reaching the handler.
pub async fn log_request(
    State(max_body_bytes): State<usize>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match Limited::new(body, max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            warn!(
                "rejecting {} {}: body exceeds {} bytes",
                parts.method, parts.uri, max_body_bytes
            );
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
        Err(err) => {
            warn!(
                "failed to read body of {} {}: {}",
                parts.method, parts.uri, err
            );
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    info!("{}", render(&parts, &bytes));

    next.run(Request::from_parts(parts, Body::from(bytes)))
        .await
}

fn render(parts: &Parts, body: &Bytes) -> String {
    let mut dump = format!("{} {} {:?}\n", parts.method, parts.uri, parts.version);
    for (name, value) in &parts.headers {
        let value = value.to_str().unwrap_or("<non-ascii>");
        dump.push_str(&format!("{}: {}\n", name, value));
    }
    dump.push('\n');
    dump.push_str(&String::from_utf8_lossy(body));
    dump
}
