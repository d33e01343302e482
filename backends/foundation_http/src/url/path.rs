//! URL path normalization.

use super::encoding;

/// Normalizes a path: removes dot segments and percent-normalizes each segment.
///
/// WHY: Two URLs naming the same resource should serialize identically, and
/// relative references are merged by string concatenation before being
/// cleaned up here.
///
/// WHAT: Applies RFC 3986 dot-segment removal. `.` is dropped, `..` pops the
/// previous segment (never past the root of an absolute path), and a path
/// ending in `.` or `..` keeps its trailing slash. Relative paths keep
/// leading `..` segments they cannot pop.
///
/// HOW: Splits on `/`, walks the segments onto an output stack and joins it
/// back together.
///
/// # Examples
///
/// ```
/// use foundation_http::url::normalize_path;
///
/// assert_eq!(normalize_path("/a/b/c/./../../g"), "/a/g");
/// assert_eq!(normalize_path("mid/content=5/../6"), "mid/6");
/// assert_eq!(normalize_path("/a/../b/c/d/../e/../../"), "/b/");
/// ```
#[must_use]
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }

    let absolute = path.starts_with('/');
    let mut output: Vec<String> = Vec::new();
    let mut trailing_slash = false;

    let mut segments = path.split('/').peekable();
    if absolute {
        segments.next();
    }

    while let Some(segment) = segments.next() {
        let is_last = segments.peek().is_none();
        match segment {
            "." => trailing_slash = is_last,
            ".." => {
                match output.last() {
                    Some(last) if last != ".." => {
                        output.pop();
                    }
                    _ if !absolute => output.push("..".to_string()),
                    _ => {}
                }
                trailing_slash = is_last;
            }
            "" if is_last => trailing_slash = true,
            other => {
                output.push(encoding::normalize(other, encoding::PATH_SEGMENT));
                trailing_slash = false;
            }
        }
    }

    let mut result = output.join("/");
    if absolute {
        result.insert(0, '/');
    }

    if trailing_slash {
        if output.is_empty() {
            if !absolute {
                result.push_str("./");
            }
        } else {
            result.push('/');
        }
    }

    result
}
