use crate::error::AppError;
use crate::request::RequestPath;
use crate::templates::{render_directory_listing, ListingEntry};
use log::{debug, warn};
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

/// What a request path refers to under the web root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    Root(PathBuf),
    Directory(PathBuf),
    File(PathBuf),
    NotFound,
}

/// Classifies `requested` against the canonical `web_root`.
///
/// Directory and file targets are canonical paths that always lie inside
/// `web_root`; anything that cannot be canonicalized, escapes the root, or
/// cannot be opened is `NotFound`.
pub fn resolve(web_root: &Path, requested: &RequestPath) -> ResolvedTarget {
    let relative = match requested {
        RequestPath::Root => return ResolvedTarget::Root(web_root.to_path_buf()),
        RequestPath::Relative(relative) => percent_decode(relative),
    };

    let canonical_path = match web_root.join(&relative).canonicalize() {
        Ok(path) => path,
        Err(e) => {
            debug!("Cannot resolve '{relative}': {e}");
            return ResolvedTarget::NotFound;
        }
    };

    if !canonical_path.starts_with(web_root) {
        warn!("Potential path traversal attempt: '{relative}'");
        return ResolvedTarget::NotFound;
    }

    if canonical_path == web_root {
        ResolvedTarget::Root(canonical_path)
    } else if canonical_path.is_dir() {
        ResolvedTarget::Directory(canonical_path)
    } else if canonical_path.is_file() && File::open(&canonical_path).is_ok() {
        ResolvedTarget::File(canonical_path)
    } else {
        ResolvedTarget::NotFound
    }
}

/// Decodes `%XX` escapes; malformed escapes are kept literally.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escape = bytes.get(i + 1..i + 3).filter(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if let (b'%', Some(hex)) = (bytes[i], escape) {
            let hex = String::from_utf8_lossy(hex);
            if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

/// Lists the immediate children of `path`, sorted by name, as an HTML page.
pub fn generate_directory_listing(path: &Path, web_root: &Path) -> Result<String, AppError> {
    debug!("Generating directory listing for: '{}'", path.display());

    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        entries.push(ListingEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir: entry.path().is_dir(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(render_directory_listing(&url_path(path, web_root), &entries))
}

/// URL path of `dir` relative to the web root, e.g. `/` or `/images/icons/`.
fn url_path(dir: &Path, web_root: &Path) -> String {
    let relative = dir.strip_prefix(web_root).unwrap_or(Path::new(""));
    let mut url = String::from("/");
    for component in relative.components() {
        if let Component::Normal(name) = component {
            url.push_str(&name.to_string_lossy());
            url.push('/');
        }
    }
    url
}
