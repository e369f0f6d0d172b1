use crate::config::{ConfigStore, ServerConfig, StoredConfig};
use crate::error::AppError;
use crate::fs::{generate_directory_listing, resolve, ResolvedTarget};
use crate::logger::{log_file_path, Logger, MAX_ENTRIES};
use crate::request::{Request, RequestPath};
use crate::response::{content_type, HttpResponse, NOT_FOUND_BODY};
use chrono::{NaiveDate, NaiveDateTime};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tempfile::tempdir;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

#[test]
fn test_parse_request_strips_one_leading_slash() {
    let request = Request::parse("GET /foo/bar.html HTTP/1.1").unwrap();
    assert_eq!(request.method, "GET");
    assert_eq!(request.raw_target, "/foo/bar.html");
    assert_eq!(request.path, RequestPath::Relative("foo/bar.html".to_string()));

    let request = Request::parse("GET //etc/passwd HTTP/1.1").unwrap();
    assert_eq!(request.path, RequestPath::Relative("/etc/passwd".to_string()));
}

#[test]
fn test_parse_request_root_sentinel() {
    assert_eq!(Request::parse("GET / HTTP/1.1").unwrap().path, RequestPath::Root);
    assert_eq!(Request::parse("GET / ").unwrap().path, RequestPath::Root);
    assert_eq!(Request::parse("GET  HTTP/1.1").unwrap().path, RequestPath::Root);
}

#[test]
fn test_parse_request_ignores_method() {
    let request = Request::parse("POST /upload.txt HTTP/1.0").unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, RequestPath::Relative("upload.txt".to_string()));
}

#[test]
fn test_parse_request_rejects_single_token() {
    assert!(matches!(
        Request::parse("GARBAGE"),
        Err(AppError::MalformedRequest(line)) if line == "GARBAGE"
    ));
    assert!(matches!(Request::parse(""), Err(AppError::MalformedRequest(_))));
}

#[test]
fn test_content_type_mapping() {
    assert_eq!(content_type("index.html"), "text/html");
    assert_eq!(content_type("old/index.htm"), "text/html");
    assert_eq!(content_type("site.css"), "text/css");
    assert_eq!(content_type("app.js"), "application/javascript");
    assert_eq!(content_type("photo.jpg"), "image/jpeg");
    assert_eq!(content_type("photo.jpeg"), "image/jpeg");
    assert_eq!(content_type("logo.png"), "image/png");
    assert_eq!(content_type("anim.gif"), "image/gif");
    assert_eq!(content_type("paper.pdf"), "application/pdf");
}

#[test]
fn test_content_type_falls_back_to_plain_text() {
    assert_eq!(content_type("README"), "text/plain");
    assert_eq!(content_type("INDEX.HTML"), "text/plain");
    assert_eq!(content_type("archive.tar.gz"), "text/plain");
    assert_eq!(content_type(""), "text/plain");
}

#[test]
fn test_resolve_classifies_targets() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("index.html"), "<h1>hi</h1>").unwrap();
    fs::create_dir(root.join("images")).unwrap();

    assert_eq!(resolve(&root, &RequestPath::Root), ResolvedTarget::Root(root.clone()));
    assert_eq!(
        resolve(&root, &RequestPath::Relative("index.html".into())),
        ResolvedTarget::File(root.join("index.html"))
    );
    assert_eq!(
        resolve(&root, &RequestPath::Relative("images".into())),
        ResolvedTarget::Directory(root.join("images"))
    );
    assert_eq!(
        resolve(&root, &RequestPath::Relative("images/".into())),
        ResolvedTarget::Directory(root.join("images"))
    );
    assert_eq!(
        resolve(&root, &RequestPath::Relative("missing.txt".into())),
        ResolvedTarget::NotFound
    );
}

#[test]
fn test_resolve_decodes_percent_escapes() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("my notes.txt"), "notes").unwrap();

    assert_eq!(
        resolve(&root, &RequestPath::Relative("my%20notes.txt".into())),
        ResolvedTarget::File(root.join("my notes.txt"))
    );
}

#[test]
fn test_resolve_never_leaves_web_root() {
    let outer = tempdir().unwrap();
    let outer_path = outer.path().canonicalize().unwrap();
    let root = outer_path.join("www");
    fs::create_dir(&root).unwrap();
    fs::create_dir(root.join("sub")).unwrap();
    fs::write(root.join("index.html"), "inside").unwrap();
    fs::write(outer_path.join("secret.txt"), "outside").unwrap();

    for attempt in [
        "../secret.txt",
        "sub/../../secret.txt",
        "%2e%2e/secret.txt",
        "..%2fsecret.txt",
        "../../../../../../etc/passwd",
        "/etc/passwd",
        "..",
    ] {
        assert_eq!(
            resolve(&root, &RequestPath::Relative(attempt.into())),
            ResolvedTarget::NotFound,
            "{attempt} escaped the web root"
        );
    }

    // Dot segments that stay inside the root are fine.
    assert_eq!(
        resolve(&root, &RequestPath::Relative("sub/../index.html".into())),
        ResolvedTarget::File(root.join("index.html"))
    );
    assert_eq!(
        resolve(&root, &RequestPath::Relative("sub/..".into())),
        ResolvedTarget::Root(root.clone())
    );
}

#[test]
fn test_generate_directory_listing_for_root() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let mut file = File::create(root.join("index.html")).unwrap();
    write!(file, "0123456789").unwrap();
    fs::create_dir(root.join("images")).unwrap();

    let html = generate_directory_listing(&root, &root).unwrap();
    assert_eq!(
        html,
        "<html><head><meta charset=\"utf-8\"><title>File list of /</title></head>\
         <body><h1>File list of /</h1><ul>\
         <li><a href=\"/images/\">images/</a></li>\
         <li><a href=\"/index.html\">index.html</a></li>\
         </ul></body></html>"
    );
}

#[test]
fn test_generate_directory_listing_for_subdirectory() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let nested = root.join("docs").join("2024");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("b.txt"), "b").unwrap();
    fs::write(nested.join("a <draft>.txt"), "a").unwrap();
    fs::create_dir(nested.join("c")).unwrap();

    let html = generate_directory_listing(&nested, &root).unwrap();
    assert!(html.contains("<h1>File list of /docs/2024/</h1>"));
    assert!(html.contains("<li><a href=\"/docs/\">.. (Back)</a></li>"));
    assert!(html.contains("<a href=\"/docs/2024/a%20%3Cdraft%3E.txt\">a &lt;draft&gt;.txt</a>"));
    assert!(html.contains("<a href=\"/docs/2024/c/\">c/</a>"));

    let a = html.find("a &lt;draft&gt;.txt").unwrap();
    let b = html.find(">b.txt<").unwrap();
    let c = html.find(">c/<").unwrap();
    assert!(a < b && b < c, "entries are not sorted by name");

    // Same directory state, same page.
    assert_eq!(html, generate_directory_listing(&nested, &root).unwrap());
}

#[test]
fn test_generate_directory_listing_escapes_links() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("tom&jerry's.txt"), "cartoon").unwrap();

    let html = generate_directory_listing(&root, &root).unwrap();
    assert!(html.contains(
        "<a href=\"/tom&amp;jerry&#x27;s.txt\">tom&amp;jerry&#x27;s.txt</a>"
    ));
}

#[test]
fn test_generate_directory_listing_for_empty_directory() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir(root.join("empty")).unwrap();

    let html = generate_directory_listing(&root.join("empty"), &root).unwrap();
    assert!(html.ends_with("<ul><li><a href=\"/\">.. (Back)</a></li></ul></body></html>"));
}

#[test]
fn test_response_framing() {
    let body = vec![0u8, 159, 146, 150, b'\r', b'\n'];
    let mut out = Vec::new();
    HttpResponse::new(body.clone(), "image/png")
        .send(&mut out, "TEST")
        .unwrap();

    let head = b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: 6\r\n\r\n";
    assert_eq!(&out[..head.len()], head);
    assert_eq!(&out[head.len()..], &body[..]);
}

#[test]
fn test_not_found_response_keeps_status_200() {
    let mut out = Vec::new();
    HttpResponse::not_found("missing.txt")
        .send(&mut out, "TEST")
        .unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n"));
    assert!(text.contains(&format!("Content-Length: {}\r\n", NOT_FOUND_BODY.len())));
    assert!(text.ends_with(&format!("\r\n\r\n{NOT_FOUND_BODY}")));
}

#[test]
fn test_logger_appends_to_daily_file() {
    let dir = tempdir().unwrap();
    let logger = Logger::new();
    logger.set_log_dir(dir.path());

    logger.log_at(at(2024, 1, 31, 23, 59, 58), "first");
    logger.log_at(at(2024, 1, 31, 23, 59, 59), "second");

    let contents = fs::read_to_string(dir.path().join("log_2024-01-31.txt")).unwrap();
    assert_eq!(
        contents,
        "[2024-01-31 23:59:58] first\n[2024-01-31 23:59:59] second\n"
    );
    assert_eq!(
        logger.entries(),
        vec![
            "[2024-01-31 23:59:58] first".to_string(),
            "[2024-01-31 23:59:59] second".to_string(),
        ]
    );
}

#[test]
fn test_logger_rotates_on_date_change() {
    let dir = tempdir().unwrap();
    let logger = Logger::new();
    logger.set_log_dir(dir.path());

    logger.log_at(at(2024, 2, 28, 23, 59, 59), "before midnight");
    logger.log_at(at(2024, 2, 29, 0, 0, 0), "after midnight");

    let day_one = fs::read_to_string(log_file_path(dir.path(), at(2024, 2, 28, 12, 0, 0))).unwrap();
    let day_two = fs::read_to_string(dir.path().join("log_2024-02-29.txt")).unwrap();
    assert_eq!(day_one, "[2024-02-28 23:59:59] before midnight\n");
    assert_eq!(day_two, "[2024-02-29 00:00:00] after midnight\n");
}

#[test]
fn test_logger_keeps_file_failures_in_memory() {
    let dir = tempdir().unwrap();
    let logger = Logger::new();
    logger.set_log_dir(dir.path().join("does-not-exist"));

    logger.log_at(at(2024, 3, 1, 8, 0, 0), "request");

    let entries = logger.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], "[2024-03-01 08:00:00] request");
    assert!(entries[1].starts_with("[2024-03-01 08:00:00] Error saving log to file:"));
    assert!(!dir.path().join("does-not-exist").exists());
}

#[test]
fn test_logger_keeps_only_recent_entries_in_memory() {
    let dir = tempdir().unwrap();
    let logger = Logger::new();
    logger.set_log_dir(dir.path());

    for i in 0..MAX_ENTRIES + 5 {
        logger.log_at(at(2024, 4, 1, 12, 0, 0), &format!("request {i}"));
    }

    let entries = logger.entries();
    assert_eq!(entries.len(), MAX_ENTRIES);
    assert_eq!(entries[0], "[2024-04-01 12:00:00] request 5");
    assert_eq!(
        entries[MAX_ENTRIES - 1],
        format!("[2024-04-01 12:00:00] request {}", MAX_ENTRIES + 4)
    );

    // The file still has every line.
    let contents = fs::read_to_string(dir.path().join("log_2024-04-01.txt")).unwrap();
    assert_eq!(contents.lines().count(), MAX_ENTRIES + 5);
}

#[test]
fn test_logger_without_directory_only_keeps_entries() {
    let logger = Logger::new();
    logger.log("hello");
    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].ends_with("] hello"));
}

#[test]
fn test_config_validation_requires_existing_directories() {
    let dir = tempdir().unwrap();
    let ok = ServerConfig::new(8080, dir.path(), dir.path()).validated().unwrap();
    assert_eq!(ok.web_root, dir.path().canonicalize().unwrap());

    let missing = dir.path().join("nope");
    assert!(matches!(
        ServerConfig::new(8080, &missing, dir.path()).validated(),
        Err(AppError::DirectoryNotFound(_))
    ));

    let file = dir.path().join("file.txt");
    fs::write(&file, "x").unwrap();
    assert!(matches!(
        ServerConfig::new(8080, dir.path(), &file).validated(),
        Err(AppError::DirectoryNotFound(_))
    ));
}

#[test]
fn test_config_store_remembers_last_values() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path().join("config.properties"));
    assert_eq!(store.load().unwrap(), StoredConfig::default());

    let stored = StoredConfig {
        port: Some(9090),
        web_directory: Some(PathBuf::from("/srv/www")),
        log_directory: Some(PathBuf::from("/var/log/www")),
    };
    store.save(&stored).unwrap();
    assert_eq!(store.load().unwrap(), stored);
}

#[test]
fn test_config_store_reads_properties_format() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.properties");
    fs::write(
        &path,
        "#Sat Mar 02 10:00:00 WIB 2024\n\nport = 8000\nwebDirectory=/srv/site\nlogDirectory=\n",
    )
    .unwrap();

    let stored = ConfigStore::new(&path).load().unwrap();
    assert_eq!(stored.port, Some(8000));
    assert_eq!(stored.web_directory, Some(PathBuf::from("/srv/site")));
    assert_eq!(stored.log_directory, None);

    fs::write(&path, "port=eighty\n").unwrap();
    assert!(matches!(
        ConfigStore::new(&path).load(),
        Err(AppError::InvalidConfig(_))
    ));
}
