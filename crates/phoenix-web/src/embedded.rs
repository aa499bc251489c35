//! 정적 파일 임베드 및 서빙.
//!
//! rust-embed로 `static/` 디렉토리의 대시보드 페이지와 에셋을 바이너리에 포함한다.

use axum::http::{header, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use rust_embed::Embed;

/// 초기 메트릭 패널이 들어갈 자리
const METRICS_PLACEHOLDER: &str = "{{METRICS}}";

#[derive(Embed)]
#[folder = "static"]
#[include = "*.html"]
#[include = "*.js"]
#[include = "*.css"]
#[include = "*.svg"]
#[include = "*.ico"]
struct Assets;

/// 대시보드 페이지에 초기 메트릭 패널을 채워 반환
///
/// 페이지 에셋이 없으면 패널만 감싼 최소 페이지를 만든다.
pub fn dashboard_page(metrics_fragment: &str) -> String {
    match Assets::get("index.html") {
        Some(index) => {
            String::from_utf8_lossy(&index.data).replace(METRICS_PLACEHOLDER, metrics_fragment)
        }
        None => format!(
            "<!DOCTYPE html><html lang=\"ko\"><head><meta charset=\"UTF-8\">\
             <title>Phoenix</title></head><body>{metrics_fragment}\
             <script src=\"/dashboard.js\"></script></body></html>"
        ),
    }
}

/// 정적 파일 서빙을 위한 fallback 핸들러
pub async fn serve_static(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    match Assets::get(path) {
        Some(content) if !path.is_empty() => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            let cache_control = if path.ends_with(".html") {
                "no-cache"
            } else {
                "public, max-age=3600"
            };

            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.as_ref()),
                    (header::CACHE_CONTROL, cache_control),
                ],
                content.data.into_owned(),
            )
                .into_response()
        }
        _ => (StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE)).into_response(),
    }
}

const NOT_FOUND_PAGE: &str = r#"<!DOCTYPE html>
<html lang="ko">
<head><meta charset="UTF-8"><title>404 - Phoenix</title>
<link rel="stylesheet" href="/dashboard.css"></head>
<body><main><h1>404</h1><p>페이지를 찾을 수 없습니다. <a href="/">대시보드</a></p></main></body>
</html>"#;
