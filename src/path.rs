//! Path translation between request paths, object keys and relative paths.
//! 请求路径、对象键与相对路径之间的转换
//!
//! Three coordinate systems meet here: the externally visible virtual
//! request path (`/media/1234/img.jpg`), the flat object key the store
//! sees (`media/1234/img.jpg`, possibly under a bucket root prefix), and
//! the caller-supplied relative path (`1234/img.jpg`). All functions are
//! pure string manipulation.

/// Replaces backslash separators with forward slashes. Idempotent,
/// defined for the empty string.
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

/// Slash-delimited prefix match: `path` equals `root` or continues with
/// the separator right after it. An empty `root` matches an empty `path`
/// or one that starts with the separator.
fn path_starts_with(path: &str, root: &str, separator: char) -> bool {
    path.starts_with(root) && (path.len() == root.len() || path[root.len()..].starts_with(separator))
}

/// Resolves a caller-supplied path to an object key under `request_root`.
///
/// A path that already carries the root (as a slash-delimited prefix) is
/// kept as-is; anything else is joined below the root. The result is
/// trimmed of surrounding slashes, and applying the function twice yields
/// the same key as applying it once.
pub fn to_key(relative_path: &str, request_root: &str) -> String {
    let path = normalize(relative_path);
    let path = path.trim_start_matches('/');
    let root = normalize(request_root);
    let root = root.trim_matches('/');

    if root.is_empty() || path_starts_with(path, root, '/') {
        path.trim_matches('/').to_string()
    } else {
        let joined = format!("{}/{}", root, path);
        joined.trim_matches('/').to_string()
    }
}

/// Strips the request root from a full path or URL, yielding the path
/// relative to the root. Inputs that do not start with the root are
/// returned normalized but otherwise unchanged.
pub fn to_relative_path(full_path_or_url: &str, request_root: &str) -> String {
    let path = normalize(full_path_or_url);
    let root = normalize(request_root);
    let root = root.trim_end_matches('/');

    if path_starts_with(&path, root, '/') {
        path[root.len()..].trim_start_matches('/').to_string()
    } else {
        path
    }
}

/// Builds the externally visible URL for a path under `request_root`.
///
/// The root is always prepended; callers are expected to pass a bare
/// relative path, duplicate roots are not suppressed here.
pub fn to_url(path: &str, request_root: &str) -> String {
    let root = normalize(request_root);
    let root = root.trim_end_matches('/');
    format!("{}/{}", root, normalize(path).trim_matches('/'))
}
