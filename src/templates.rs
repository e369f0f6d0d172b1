//! HTML rendering for directory listings.

/// One child of a listed directory.
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Renders the listing page for the directory at URL path `url_path`
/// (always starting and ending with `/`).
///
/// A back link to the parent is emitted unless `url_path` is the web root.
pub fn render_directory_listing(url_path: &str, entries: &[ListingEntry]) -> String {
    let title = html_escape(url_path);
    let mut html = format!(
        "<html><head><meta charset=\"utf-8\"><title>File list of {title}</title></head>\
         <body><h1>File list of {title}</h1><ul>"
    );

    if let Some(parent) = parent_url(url_path) {
        html.push_str(&format!(
            "<li><a href=\"{}\">.. (Back)</a></li>",
            href(&parent)
        ));
    }

    for entry in entries {
        let suffix = if entry.is_dir { "/" } else { "" };
        html.push_str(&format!(
            "<li><a href=\"{}{}\">{}{}</a></li>",
            href(&format!("{url_path}{}", entry.name)),
            suffix,
            html_escape(&entry.name),
            suffix
        ));
    }

    html.push_str("</ul></body></html>");
    html
}

fn parent_url(url_path: &str) -> Option<String> {
    let trimmed = url_path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    let (parent, _) = trimmed.rsplit_once('/')?;
    Some(format!("{parent}/"))
}

/// An attribute-safe link target for `path`.
fn href(path: &str) -> String {
    html_escape(&percent_encode(path))
}

/// Simple percent encoding for URLs
fn percent_encode(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            ' ' => "%20".to_string(),
            '"' => "%22".to_string(),
            '#' => "%23".to_string(),
            '%' => "%25".to_string(),
            '<' => "%3C".to_string(),
            '>' => "%3E".to_string(),
            '?' => "%3F".to_string(),
            _ => c.to_string(),
        })
        .collect()
}

/// Simple HTML entity escaping
fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
