use std::fmt::{Display, Formatter, Result as FmtResult};

/// A normalized slash-delimited path in the file manager namespace.
///
/// Leading, trailing and repeated slashes are dropped, so `"/a//b/"` and
/// `"a/b"` name the same entity. The empty path is the share root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LogicalPath {
    normalized: String,
}

impl LogicalPath {
    pub fn new(raw: &str) -> Self {
        let normalized = raw
            .trim()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        Self { normalized }
    }

    pub fn root() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    pub fn is_root(&self) -> bool {
        self.normalized.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.normalized.split('/').filter(|s| !s.is_empty())
    }

    /// Every prefix of this path, shortest first and ending with the path
    /// itself. Empty for the root.
    pub fn ancestors(&self) -> Vec<LogicalPath> {
        let mut prefixes = Vec::new();
        let mut current = String::new();
        for segment in self.segments() {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            prefixes.push(LogicalPath {
                normalized: current.clone(),
            });
        }
        prefixes
    }

    /// The containing directory; the root is its own parent.
    pub fn parent(&self) -> LogicalPath {
        match self.normalized.rsplit_once('/') {
            Some((parent, _)) => LogicalPath {
                normalized: parent.to_string(),
            },
            None => LogicalPath::root(),
        }
    }

    /// The last segment, empty for the root.
    pub fn name(&self) -> &str {
        match self.normalized.rsplit_once('/') {
            Some((_, name)) => name,
            None => &self.normalized,
        }
    }

    pub fn join(&self, child: &str) -> LogicalPath {
        LogicalPath::new(&format!("{}/{}", self.normalized, child))
    }
}

impl Display for LogicalPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "/{}", self.normalized)
    }
}

impl From<&str> for LogicalPath {
    fn from(raw: &str) -> Self {
        LogicalPath::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(LogicalPath::new("/a/b/").as_str(), "a/b");
        assert_eq!(LogicalPath::new("a//b").as_str(), "a/b");
        assert_eq!(LogicalPath::new(" /a/b ").as_str(), "a/b");
        assert_eq!(LogicalPath::new("a/b"), LogicalPath::new("///a/b"));
    }

    #[test]
    fn test_root() {
        assert!(LogicalPath::new("").is_root());
        assert!(LogicalPath::new("///").is_root());
        assert_eq!(LogicalPath::root().parent(), LogicalPath::root());
        assert_eq!(LogicalPath::root().name(), "");
        assert!(LogicalPath::root().ancestors().is_empty());
    }

    #[test]
    fn test_ancestors_shortest_first() {
        let ancestors: Vec<String> = LogicalPath::new("/a/b/c")
            .ancestors()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();
        assert_eq!(ancestors, vec!["a", "a/b", "a/b/c"]);
    }

    #[test]
    fn test_parent_and_name() {
        let path = LogicalPath::new("media/images/logo.png");
        assert_eq!(path.parent().as_str(), "media/images");
        assert_eq!(path.name(), "logo.png");

        let top = LogicalPath::new("logo.png");
        assert!(top.parent().is_root());
        assert_eq!(top.name(), "logo.png");
    }

    #[test]
    fn test_join() {
        assert_eq!(LogicalPath::root().join("a").as_str(), "a");
        assert_eq!(LogicalPath::new("a").join("/b/c/").as_str(), "a/b/c");
    }

    #[test]
    fn test_display_has_leading_slash() {
        assert_eq!(LogicalPath::new("a/b").to_string(), "/a/b");
        assert_eq!(LogicalPath::root().to_string(), "/");
    }
}
