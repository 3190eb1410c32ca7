use std::sync::Arc;

use axum::{extract::State, response::Html, routing::get, Router};

use crate::classify::format_file_size;
use crate::models::{ChallengeView, StorageStats};
use crate::viewer::FRAME_SANDBOX;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(dashboard_page))
}

async fn dashboard_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let stats = state.host.get_stats();
    let challenge = state.challenges.issue();

    Html(render_dashboard(
        &stats,
        &challenge,
        state.host.max_upload_size(),
    ))
}

/// Stylesheet shared by the dashboard and the viewer pages
pub const STYLE: &str = r#"
    :root {
        --bg-primary: #0a0e1a;
        --bg-card: #1a1f35;
        --bg-input: #151b2e;
        --border-color: #2a3152;
        --text-primary: #e8ecf4;
        --text-secondary: #8892a8;
        --accent-primary: #6366f1;
        --accent-primary-hover: #818cf8;
        --accent-success: #10b981;
        --accent-danger: #ef4444;
        --radius-sm: 8px;
        --radius-md: 12px;
    }
    * { margin:0; padding:0; box-sizing:border-box; }
    body {
        font-family: 'Inter', -apple-system, BlinkMacSystemFont, sans-serif;
        background: var(--bg-primary);
        color: var(--text-primary);
        min-height: 100vh;
    }
    .header {
        background: rgba(17,24,39,0.8);
        border-bottom: 1px solid var(--border-color);
        padding: 0 2rem;
        height: 64px;
        display: flex;
        align-items: center;
        justify-content: space-between;
        gap: 1rem;
    }
    .logo-text { font-size: 1.25rem; font-weight: 700; color: var(--accent-primary-hover); }
    .container { max-width: 960px; margin: 2rem auto; padding: 0 1rem; display: grid; gap: 1.5rem; }
    .card {
        background: var(--bg-card);
        border: 1px solid var(--border-color);
        border-radius: var(--radius-md);
        padding: 1.5rem;
    }
    .card h2 { font-size: 1.1rem; margin-bottom: 1rem; }
    .muted { color: var(--text-secondary); font-size: 0.875rem; }
    .btn {
        display: inline-flex; align-items: center; gap: 6px;
        padding: 6px 12px;
        border-radius: var(--radius-sm);
        border: 1px solid var(--border-color);
        background: transparent;
        color: var(--text-primary);
        text-decoration: none;
        cursor: pointer;
        font-size: 0.875rem;
    }
    .btn:hover { border-color: var(--accent-primary); }
    .btn:disabled { opacity: 0.5; cursor: not-allowed; }
    .btn-primary { background: var(--accent-primary); border-color: var(--accent-primary); }
    input, select {
        width: 100%;
        padding: 8px 10px;
        margin-top: 0.5rem;
        background: var(--bg-input);
        border: 1px solid var(--border-color);
        border-radius: var(--radius-sm);
        color: var(--text-primary);
    }
    .tabs { display: flex; gap: 0.5rem; }
    .tab.active { background: var(--accent-primary); border-color: var(--accent-primary); }
    .hidden { display: none !important; }
    .challenge { font-size: 1.25rem; font-weight: 600; text-align: center; margin-top: 1rem; }
    .file-row {
        display: flex; align-items: center; gap: 0.75rem;
        padding: 0.75rem 0;
        border-top: 1px solid var(--border-color);
    }
    .file-icon { font-size: 1.25rem; width: 1.75rem; text-align: center; }
    .file-info { flex: 1; min-width: 0; }
    .file-name { font-weight: 500; white-space: nowrap; overflow: hidden; text-overflow: ellipsis; }
    .badge { font-size: 0.75rem; border: 1px solid var(--border-color); border-radius: 999px; padding: 2px 8px; }
    .file-actions { display: flex; gap: 0.5rem; }
    .gallery-frame, .viewer-frame { width: 100%; border: 1px solid var(--border-color); border-radius: var(--radius-sm); background: white; }
    .gallery-frame { height: 600px; margin-top: 1rem; }
    body.viewer { display: flex; flex-direction: column; height: 100vh; }
    .viewer-frame { flex: 1; border-radius: 0; border: 0; }
    .viewer-title { flex: 1; font-weight: 600; white-space: nowrap; overflow: hidden; text-overflow: ellipsis; }
    .empty-state { max-width: 420px; margin: 4rem auto; text-align: center; display: grid; gap: 1rem; justify-items: center; }
    .toast-container { position: fixed; bottom: 1.5rem; right: 1.5rem; display: grid; gap: 0.5rem; }
    .toast { background: var(--bg-card); border: 1px solid var(--border-color); border-radius: var(--radius-sm); padding: 10px 14px; }
    .toast.success { border-color: var(--accent-success); }
    .toast.error { border-color: var(--accent-danger); }
"#;

/// Client side of the page shell.
///
/// The upload form, the file list and the gallery each own their state. A
/// successful upload reloads the list and the gallery through `bumpRefresh`.
const SCRIPT: &str = r#"
    const API = '/api';
    const ICONS = { web_page: '🌐', image: '🖼️', video: '🎬', spreadsheet: '📊', document: '📄' };
    let challenge = INITIAL_CHALLENGE;
    let copiedId = null;
    let selectedPage = '';
    let frameKey = 0;

    // ── Toast Notifications ─────────────────────────
    function toast(message, type = 'info') {
        const el = document.createElement('div');
        el.className = 'toast ' + type;
        el.textContent = message;
        document.getElementById('toasts').appendChild(el);
        setTimeout(() => el.remove(), 3000);
    }

    function escapeHtml(str) {
        const div = document.createElement('div');
        div.textContent = str;
        return div.innerHTML;
    }

    function bumpRefresh() {
        loadFiles();
        loadPages();
    }

    function showTab(name) {
        document.querySelectorAll('.tab').forEach(t => t.classList.toggle('active', t.dataset.tab === name));
        document.querySelectorAll('.tab-panel').forEach(p => p.classList.toggle('hidden', p.id !== 'panel-' + name));
    }

    // ── Upload Form ─────────────────────────────────
    function setChallenge(next) {
        challenge = next;
        document.getElementById('challenge-text').textContent = next.a + ' + ' + next.b + ' = ?';
        document.getElementById('answer').value = '';
        updateUploadControls();
    }

    function updateUploadControls() {
        const hasAnswer = document.getElementById('answer').value.trim() !== '';
        document.getElementById('file-input').disabled = !hasAnswer;
        document.getElementById('pick-button').disabled = !hasAnswer;
    }

    async function uploadSelected(event) {
        const input = event.target;
        const file = input.files[0];
        if (!file) return;

        const form = new FormData();
        form.append('token', challenge.token);
        form.append('answer', document.getElementById('answer').value);
        form.append('file', file);

        const button = document.getElementById('pick-button');
        button.disabled = true;
        button.textContent = 'Uploading...';
        try {
            const res = await fetch(API + '/upload', { method: 'POST', body: form });
            const data = await res.json();
            if (!res.ok) {
                toast(data.message || 'Upload failed', 'error');
                if (data.challenge) setChallenge(data.challenge);
                return;
            }
            toast('File uploaded!', 'success');
            setChallenge(data.challenge);
            input.value = '';
            bumpRefresh();
        } catch (e) {
            console.error('Upload error:', e);
            toast('Upload failed', 'error');
        } finally {
            button.textContent = 'Choose file';
            updateUploadControls();
        }
    }

    // ── File List ───────────────────────────────────
    async function loadFiles() {
        const body = document.getElementById('file-list');
        try {
            const res = await fetch(API + '/files');
            if (!res.ok) throw new Error('HTTP ' + res.status);
            const data = await res.json();
            document.getElementById('file-count').textContent = data.count;
            if (data.count === 0) {
                body.innerHTML = '<p class="muted">No files yet</p>';
                return;
            }
            body.innerHTML = data.files.map(f => {
                const date = new Date(f.upload_date).toLocaleDateString();
                return '<div class="file-row">' +
                    '<span class="file-icon">' + (ICONS[f.icon] || ICONS.document) + '</span>' +
                    '<div class="file-info">' +
                    '<div class="file-name" title="' + escapeHtml(f.original_name) + '">' + escapeHtml(f.original_name) + '</div>' +
                    '<div class="muted">' + f.size_human + ' • ' + date + ' • ' + f.download_count + ' downloads</div>' +
                    '</div>' +
                    '<span class="badge">' + escapeHtml(f.kind) + '</span>' +
                    '<div class="file-actions">' +
                    (f.is_html ? '<button class="btn" onclick="previewFile(\'' + f.id + '\')" title="Preview">👁</button>' : '') +
                    '<button class="btn" onclick="copyLink(\'' + f.id + '\')" title="Copy link">' + (copiedId === f.id ? '✓' : '⧉') + '</button>' +
                    '<button class="btn" onclick="downloadFile(\'' + f.id + '\')" title="Download">⬇</button>' +
                    '</div></div>';
            }).join('');
        } catch (e) {
            console.error('Error fetching files:', e);
            toast('Could not load files', 'error');
        }
    }

    async function downloadFile(id) {
        try {
            const res = await fetch(API + '/files/' + id + '/download', { method: 'POST' });
            if (!res.ok) throw new Error('HTTP ' + res.status);
            const data = await res.json();
            const a = document.createElement('a');
            a.href = data.url;
            a.download = data.filename;
            document.body.appendChild(a);
            a.click();
            a.remove();
            loadFiles();
        } catch (e) {
            console.error('Download error:', e);
            toast('Download failed', 'error');
        }
    }

    async function copyLink(id) {
        try {
            const res = await fetch(API + '/files/' + id + '/link');
            if (!res.ok) throw new Error('HTTP ' + res.status);
            const data = await res.json();
            await navigator.clipboard.writeText(data.url);
            copiedId = id;
            toast('Link copied!', 'success');
            loadFiles();
            setTimeout(() => { copiedId = null; loadFiles(); }, 2000);
        } catch (e) {
            toast('Could not copy link', 'error');
        }
    }

    async function previewFile(id) {
        try {
            const res = await fetch(API + '/files/' + id + '/preview');
            if (!res.ok) throw new Error('HTTP ' + res.status);
            const data = await res.json();
            window.open(data.url, '_blank');
        } catch (e) {
            toast('Preview unavailable', 'error');
        }
    }

    // ── HTML Gallery ────────────────────────────────
    async function loadPages() {
        const panel = document.getElementById('gallery');
        try {
            const res = await fetch(API + '/pages');
            if (!res.ok) throw new Error('HTTP ' + res.status);
            const data = await res.json();
            if (data.count === 0) {
                panel.innerHTML = '<p class="muted">No HTML pages yet</p>';
                return;
            }
            if (!selectedPage || !data.files.some(f => f.id === selectedPage)) {
                selectedPage = data.files[0].id;
            }
            const options = data.files.map(f =>
                '<option value="' + f.id + '"' + (f.id === selectedPage ? ' selected' : '') + '>' +
                escapeHtml(f.original_name) + '</option>').join('');
            panel.innerHTML =
                '<select id="page-select" onchange="selectPage(this.value)">' + options + '</select>' +
                '<div class="file-actions" style="margin-top:0.75rem">' +
                '<button class="btn" onclick="refreshViewer()">⟳ Refresh</button>' +
                '<button class="btn" onclick="openPageInNewTab()">Open in new tab ↗</button>' +
                '</div><div id="frame-slot"></div>';
            renderFrame();
        } catch (e) {
            console.error('Error fetching HTML files:', e);
            toast('Could not load HTML pages', 'error');
        }
    }

    function renderFrame() {
        const slot = document.getElementById('frame-slot');
        if (!slot || !selectedPage) return;
        const frame = document.createElement('iframe');
        frame.className = 'gallery-frame';
        frame.dataset.key = String(frameKey);
        frame.setAttribute('sandbox', FRAME_SANDBOX);
        frame.src = '/view/' + selectedPage;
        slot.replaceChildren(frame);
    }

    function selectPage(id) {
        selectedPage = id;
        renderFrame();
    }

    function refreshViewer() {
        frameKey++;
        renderFrame();
        toast('Viewer refreshed', 'success');
    }

    function openPageInNewTab() {
        if (selectedPage) window.open('/view/' + selectedPage, '_blank');
    }

    document.getElementById('answer').addEventListener('input', updateUploadControls);
    document.getElementById('file-input').addEventListener('change', uploadSelected);
    document.getElementById('pick-button').addEventListener('click', () => document.getElementById('file-input').click());
    updateUploadControls();
    loadFiles();
    loadPages();
"#;

fn render_dashboard(stats: &StorageStats, challenge: &ChallengeView, max_upload_size: u64) -> String {
    let initial_challenge = serde_json::json!({
        "token": challenge.token,
        "a": challenge.a,
        "b": challenge.b,
    });

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>FileDrop — File Hosting</title>
    <meta name="description" content="FileDrop: upload, share and preview files">
    <style>{style}</style>
</head>
<body>
    <header class="header">
        <span class="logo-text">FileDrop</span>
        <span class="muted">{total_files} files • {total_size} • {html_pages} pages</span>
        <nav class="tabs">
            <button class="btn tab active" data-tab="files" onclick="showTab('files')">Files</button>
            <button class="btn tab" data-tab="gallery" onclick="showTab('gallery')">HTML viewer</button>
        </nav>
    </header>

    <main class="container tab-panel" id="panel-files">
        <section class="card">
            <h2>Upload a file</h2>
            <p class="muted">Max {max_size} • images, videos, spreadsheets, documents, text and HTML</p>
            <p class="muted" style="margin-top:1rem">Anti-robot check:</p>
            <p class="challenge" id="challenge-text">{a} + {b} = ?</p>
            <input id="answer" type="number" placeholder="Your answer">
            <input id="file-input" type="file" accept="image/*,video/*,text/*,.pdf,.doc,.docx,.xls,.xlsx,.html,.htm">
            <button id="pick-button" class="btn btn-primary" style="margin-top:1rem;width:100%;justify-content:center">Choose file</button>
        </section>

        <section class="card">
            <h2>Hosted files (<span id="file-count">{total_files}</span>)</h2>
            <div id="file-list"><p class="muted">Loading files...</p></div>
        </section>
    </main>

    <main class="container tab-panel hidden" id="panel-gallery">
        <section class="card">
            <h2>HTML viewer</h2>
            <div id="gallery"><p class="muted">Loading pages...</p></div>
        </section>
    </main>

    <div class="toast-container" id="toasts"></div>

    <script>
        const INITIAL_CHALLENGE = {initial_challenge};
        const FRAME_SANDBOX = '{sandbox}';
        {script}
    </script>
</body>
</html>"##,
        style = STYLE,
        total_files = stats.total_files,
        total_size = stats.total_size_human,
        html_pages = stats.html_pages,
        max_size = format_file_size(max_upload_size),
        a = challenge.a,
        b = challenge.b,
        initial_challenge = initial_challenge,
        sandbox = FRAME_SANDBOX,
        script = SCRIPT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> StorageStats {
        StorageStats {
            total_files: 3,
            html_pages: 1,
            total_size: 2048,
            total_size_human: "2 KB".to_string(),
            total_downloads: 0,
        }
    }

    #[test]
    fn test_render_shows_challenge_and_limits() {
        let challenge = ChallengeView {
            token: "abc123".to_string(),
            a: 4,
            b: 9,
        };
        let html = render_dashboard(&stats(), &challenge, 5 * 1024 * 1024);

        assert!(html.contains("4 + 9 = ?"));
        assert!(html.contains(r#""token":"abc123""#));
        assert!(html.contains("Max 5 MB"));
        assert!(html.contains("3 files • 2 KB • 1 pages"));
        assert!(html.contains(FRAME_SANDBOX));
        assert!(!html.contains("allow-top-navigation"));
    }

    #[test]
    fn test_render_has_both_tabs() {
        let challenge = ChallengeView {
            token: "t".to_string(),
            a: 1,
            b: 1,
        };
        let html = render_dashboard(&stats(), &challenge, 1024);
        assert!(html.contains(r#"id="panel-files""#));
        assert!(html.contains(r#"id="panel-gallery""#));
    }

    #[test]
    fn test_upload_success_reloads_list_and_gallery() {
        let start = SCRIPT.find("function bumpRefresh()").unwrap();
        let end = start + SCRIPT[start..].find('}').unwrap();
        let body = &SCRIPT[start..end];
        assert!(body.contains("loadFiles();"));
        assert!(body.contains("loadPages();"));
        assert!(!SCRIPT.contains("refreshTrigger"));
    }
}
