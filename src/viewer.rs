//! `/view/:fileId`: renders one uploaded HTML page inside an isolated frame.
//!
//! The page is passed inline through `srcdoc`, never by URL, and the frame gets
//! no `allow-top-navigation`, so the embedded page cannot move the parent.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};

use crate::dashboard::STYLE;
use crate::models::FileRecord;
use crate::AppState;

/// Capabilities granted to embedded pages
pub const FRAME_SANDBOX: &str = "allow-same-origin allow-scripts allow-popups allow-forms";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/view/:file_id", get(view_page))
}

async fn view_page(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> (StatusCode, Html<String>) {
    match state.host.page_content(&file_id) {
        Ok(Some((record, content))) => (StatusCode::OK, Html(render_page(&record, &content))),
        Ok(None) => {
            tracing::debug!("Viewer: no file {}", file_id);
            (
                StatusCode::NOT_FOUND,
                Html(render_message(
                    "File not found",
                    "This page does not exist or was never uploaded.",
                )),
            )
        }
        Err(e) => {
            tracing::error!("Viewer failed to load {}: {}", file_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_message(
                    "Could not load file",
                    "The page content could not be read. Try again later.",
                )),
            )
        }
    }
}

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_page(record: &FileRecord, content: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{name} — FileDrop</title>
    <style>{style}</style>
</head>
<body class="viewer">
    <header class="header">
        <a class="btn" href="/">← Back</a>
        <span class="viewer-title" title="{name}">{name}</span>
        <button class="btn" onclick="openInNewTab()">Open in new tab ↗</button>
    </header>
    <iframe id="page-frame" class="viewer-frame" title="{name}" sandbox="{sandbox}" srcdoc="{content}"></iframe>
    <script>
        function openInNewTab() {{
            const html = document.getElementById('page-frame').getAttribute('srcdoc');
            const url = URL.createObjectURL(new Blob([html], {{ type: 'text/html' }}));
            window.open(url, '_blank');
        }}
    </script>
</body>
</html>"##,
        name = escape_html(&record.original_name),
        style = STYLE,
        sandbox = FRAME_SANDBOX,
        content = escape_html(content),
    )
}

fn render_message(title: &str, detail: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title} — FileDrop</title>
    <style>{style}</style>
</head>
<body>
    <div class="card empty-state">
        <h2>{title}</h2>
        <p class="muted">{detail}</p>
        <a class="btn btn-primary" href="/">← Back</a>
    </div>
</body>
</html>"##,
        title = escape_html(title),
        detail = escape_html(detail),
        style = STYLE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::ChallengeBook;
    use crate::config::Config;
    use crate::service::{FileHost, UploadFile};
    use axum::body::Body;
    use axum::http::Request;
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    fn setup() -> (TempDir, Arc<AppState>) {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::build(
            "127.0.0.1".into(),
            3210,
            temp_dir.path().to_str().unwrap().to_string(),
            None,
            None,
        );
        let state = Arc::new(AppState {
            host: FileHost::new(&config).unwrap(),
            challenges: ChallengeBook::new(),
            config,
        });
        (temp_dir, state)
    }

    async fn fetch(state: Arc<AppState>, uri: &str) -> (StatusCode, String) {
        let app = routes().with_state(state);
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x" title='y'>&</a>"#),
            "&lt;a href=&quot;x&quot; title=&#39;y&#39;&gt;&amp;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[tokio::test]
    async fn test_renders_page_inline_in_sandbox() {
        let (_temp_dir, state) = setup();
        let record = state
            .host
            .upload(UploadFile {
                name: "report.html".into(),
                mime_type: String::new(),
                data: Bytes::from_static(b"<script>top.location='x'</script><p>\"hi\"</p>"),
            })
            .unwrap();

        let (status, body) = fetch(state, &format!("/view/{}", record.id)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(
            r#"sandbox="allow-same-origin allow-scripts allow-popups allow-forms""#
        ));
        assert!(!body.contains("allow-top-navigation"));
        assert!(body.contains(
            "srcdoc=\"&lt;script&gt;top.location=&#39;x&#39;&lt;/script&gt;&lt;p&gt;&quot;hi&quot;&lt;/p&gt;\""
        ));
        assert!(!body.contains("<script>top.location"));
        assert!(!body.contains(&record.storage_path));
        assert!(body.contains("report.html"));
    }

    #[tokio::test]
    async fn test_unknown_id_shows_not_found_with_back_action() {
        let (_temp_dir, state) = setup();
        let (status, body) = fetch(state, "/view/does-not-exist").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("File not found"));
        assert!(body.contains(r#"href="/""#));
    }
}
