use crate::error::{ExtractError, Result};
use archmap_manifest::ParseResult;
use std::path::Path;

/// Source files above this size are not parsed
pub const MAX_SOURCE_BYTES: u64 = 10 * 1024 * 1024;

/// Name used when a file's service cannot be inferred
pub const UNKNOWN_SERVICE: &str = "unknown";

/// One source language: a grammar, its queries and the mapping from query
/// matches to entities.
pub trait LanguagePlugin: Send + Sync {
    /// Registry key, compared case-insensitively
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Extensions without the leading dot
    fn extensions(&self) -> &[&'static str];

    fn supports_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions().iter().any(|known| *known == ext))
    }

    /// Service a file belongs to; defaults to its parent directory's name
    fn infer_service_name(&self, path: &Path) -> String {
        path.parent()
            .and_then(|dir| dir.file_name())
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_SERVICE)
            .to_string()
    }

    /// Extract entities from `path`, attributing them to `service_name`.
    ///
    /// Syntax errors are not failures: the partial tree is still queried and
    /// [`ParseResult::syntax_errors`] is set.
    fn parse_file(&self, path: &Path, service_name: &str) -> Result<ParseResult>;
}

/// Read a source file, rejecting anything above [`MAX_SOURCE_BYTES`].
/// Invalid UTF-8 is replaced rather than rejected.
pub fn read_source(path: &Path) -> Result<String> {
    let size = std::fs::metadata(path)?.len();
    if size > MAX_SOURCE_BYTES {
        return Err(ExtractError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            limit: MAX_SOURCE_BYTES,
        });
    }
    let bytes = std::fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

/// Directory holding `path`, as a string, for `Service::path`
pub fn service_root(path: &Path) -> String {
    path.parent()
        .map(|dir| dir.to_string_lossy().into_owned())
        .filter(|dir| !dir.is_empty())
        .unwrap_or_else(|| ".".to_string())
}

/// Host part of an absolute URL, if it has one
pub fn url_host(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?;
    let host = match host.strip_prefix('[') {
        Some(v6) => v6.split(']').next()?,
        None => host.split(':').next()?,
    };
    (!host.is_empty()).then_some(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Dummy;

    impl LanguagePlugin for Dummy {
        fn name(&self) -> &str {
            "dummy"
        }
        fn version(&self) -> &str {
            "0.0.1"
        }
        fn extensions(&self) -> &[&'static str] {
            &["dm", "dmy"]
        }
        fn parse_file(&self, path: &Path, _service_name: &str) -> Result<ParseResult> {
            Ok(ParseResult::new(path.to_string_lossy(), "dummy"))
        }
    }

    #[test]
    fn default_supports_file_matches_extension_exactly() {
        assert!(Dummy.supports_file(Path::new("a/b.dm")));
        assert!(Dummy.supports_file(Path::new("b.dmy")));
        assert!(!Dummy.supports_file(Path::new("b.DM")));
        assert!(!Dummy.supports_file(Path::new("dm")));
    }

    #[test]
    fn service_name_is_parent_directory() {
        assert_eq!(Dummy.infer_service_name(Path::new("svc/users/app.dm")), "users");
        assert_eq!(Dummy.infer_service_name(Path::new("app.dm")), UNKNOWN_SERVICE);
    }

    #[test]
    fn url_host_extraction() {
        assert_eq!(url_host("http://x/y"), Some("x"));
        assert_eq!(url_host("https://user:pw@billing.svc:8080/charge?x=1"), Some("billing.svc"));
        assert_eq!(url_host("http://[::1]:80/"), Some("::1"));
        assert_eq!(url_host("/relative/path"), None);
        assert_eq!(url_host("http:///nohost"), None);
    }

    #[test]
    fn read_source_rejects_large_files_and_tolerates_bad_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let big = dir.path().join("big.py");
        std::fs::File::create(&big)
            .unwrap()
            .set_len(MAX_SOURCE_BYTES + 1)
            .unwrap();
        assert!(matches!(
            read_source(&big),
            Err(ExtractError::FileTooLarge { .. })
        ));

        let odd = dir.path().join("odd.py");
        std::fs::write(&odd, b"x = '\xff'\n").unwrap();
        assert_eq!(read_source(&odd).unwrap(), "x = '\u{FFFD}'\n");
    }
}
