//! File classification shared by the upload form, the file list and the gallery.
//!
//! Everything here is a pure function of the display name and the reported MIME
//! type, so the three components can never disagree about what counts as a page.

use serde::Serialize;

/// MIME prefixes accepted by the upload form
const ALLOWED_PREFIXES: &[&str] = &["image/", "video/", "text/"];

/// Exact document types accepted by the upload form
const ALLOWED_DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// True when the file is an HTML page, by MIME type or by `.html`/`.htm` suffix.
pub fn is_html(name: &str, mime_type: &str) -> bool {
    if mime_type == "text/html" {
        return true;
    }
    let lower = name.to_lowercase();
    lower.ends_with(".html") || lower.ends_with(".htm")
}

pub fn is_allowed_type(name: &str, mime_type: &str) -> bool {
    ALLOWED_PREFIXES.iter().any(|p| mime_type.starts_with(p))
        || ALLOWED_DOCUMENT_TYPES.iter().any(|t| mime_type.starts_with(t))
        || is_html(name, mime_type)
}

/// Icon shown next to a file in the list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileIcon {
    WebPage,
    Image,
    Video,
    Spreadsheet,
    Document,
}

impl FileIcon {
    pub fn for_file(name: &str, mime_type: &str) -> Self {
        // Pages win even when the MIME prefix says otherwise
        if is_html(name, mime_type) {
            FileIcon::WebPage
        } else if mime_type.starts_with("image/") {
            FileIcon::Image
        } else if mime_type.starts_with("video/") {
            FileIcon::Video
        } else if mime_type.contains("sheet") || mime_type.contains("excel") {
            FileIcon::Spreadsheet
        } else {
            FileIcon::Document
        }
    }
}

/// Badge text for a MIME type: its top-level type, e.g. `image` for `image/png`.
pub fn kind_label(mime_type: &str) -> String {
    match mime_type.split('/').next() {
        Some(kind) if !kind.is_empty() => kind.to_string(),
        _ => "file".to_string(),
    }
}

/// Format a byte count with base-1024 units, rounded to two decimals.
///
/// Trailing zeros are dropped: `1536` becomes `1.5 KB`, `2048` becomes `2 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;
    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    let rounded = (size * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit_idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_html_by_mime_or_suffix() {
        assert!(is_html("page.bin", "text/html"));
        assert!(is_html("report.html", ""));
        assert!(is_html("REPORT.HTM", "application/octet-stream"));
        assert!(is_html("Index.Html", "text/plain"));
        assert!(!is_html("notes.txt", "text/plain"));
        assert!(!is_html("page.html.txt", "text/plain"));
        assert!(!is_html("page.xhtml5", "application/xhtml+xml"));
    }

    #[test]
    fn test_allowed_types() {
        assert!(is_allowed_type("cat.png", "image/png"));
        assert!(is_allowed_type("clip.mp4", "video/mp4"));
        assert!(is_allowed_type("notes.md", "text/markdown"));
        assert!(is_allowed_type("paper.pdf", "application/pdf"));
        assert!(is_allowed_type("paper.pdf", "application/pdf; name=paper.pdf"));
        assert!(is_allowed_type("sheet.xls", "application/vnd.ms-excel"));
        assert!(is_allowed_type(
            "doc.docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        ));
        assert!(is_allowed_type("site.htm", ""));
        assert!(!is_allowed_type("tool.exe", "application/x-msdownload"));
        assert!(!is_allowed_type("archive.zip", "application/zip"));
        assert!(!is_allowed_type("mystery", ""));
    }

    #[test]
    fn test_icon_selection() {
        assert_eq!(FileIcon::for_file("a.png", "image/png"), FileIcon::Image);
        assert_eq!(FileIcon::for_file("a.webm", "video/webm"), FileIcon::Video);
        assert_eq!(
            FileIcon::for_file(
                "a.xlsx",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            ),
            FileIcon::Spreadsheet
        );
        assert_eq!(FileIcon::for_file("a.xls", "application/vnd.ms-excel"), FileIcon::Spreadsheet);
        assert_eq!(FileIcon::for_file("a.pdf", "application/pdf"), FileIcon::Document);
        assert_eq!(FileIcon::for_file("a.html", "text/html"), FileIcon::WebPage);
        // a page misreported as an image still gets the page icon
        assert_eq!(FileIcon::for_file("a.html", "image/png"), FileIcon::WebPage);
    }

    #[test]
    fn test_kind_label() {
        assert_eq!(kind_label("image/png"), "image");
        assert_eq!(kind_label("text/html; charset=utf-8"), "text");
        assert_eq!(kind_label(""), "file");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(1), "1 Bytes");
        assert_eq!(format_file_size(1023), "1023 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1200), "1.17 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
        assert_eq!(format_file_size(2048 * 1024 * 1024 * 1024), "2048 GB");
    }
}
