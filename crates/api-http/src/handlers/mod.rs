// HTTP handlers, grouped by resource.

pub mod api_keys;
pub mod jobs;
pub mod problems;
pub mod submissions;

use axum::http::StatusCode;
use axum::response::Html;

/// Liveness probe.
pub async fn sanity_check() -> StatusCode {
    StatusCode::OK
}

/// Minimal landing page for human visitors; live monitoring happens over
/// the push transport.
pub async fn monitor_page() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head><title>Judge</title></head>
<body>
    <h1>Judge coordinator</h1>
    <p>Subscribe to the <code>monitor</code> room for live job updates.</p>
</body>
</html>"#,
    )
}
