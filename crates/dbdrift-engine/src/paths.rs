//! Diff paths
//!
//! A diff path addresses one attribute inside an object record:
//! `columns`, `options.fillfactor`, `args[2].mode`. Keys that would make the
//! path ambiguous are written in bracket form: `options["a.b"]`.

use regex::RegexSet;

fn needs_quoting(key: &str) -> bool {
    key.is_empty() || key.contains(['.', '[', ']', '"', '\\'])
}

/// Path of a mapping key below `parent` (empty for record attributes)
pub fn child_path(parent: &str, key: &str) -> String {
    if needs_quoting(key) {
        let escaped = key.replace('\\', "\\\\").replace('"', "\\\"");
        format!("{}[\"{}\"]", parent, escaped)
    } else if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Path of a sequence element below `parent`
pub fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

/// Path shared by every element of an unordered sequence below `parent`
///
/// Matches patterns written with an index wildcard, such as `columns[*].tags`.
pub fn element_path(parent: &str) -> String {
    format!("{}[*]", parent)
}

/// Translate a glob-like path pattern into an anchored regex
///
/// `**` matches anything, `*` matches within a single segment.
fn pattern_to_regex(pattern: &str) -> String {
    let mut regex = String::from("^");
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '*' {
            if chars.peek() == Some(&'*') {
                chars.next();
                regex.push_str(".*");
            } else {
                regex.push_str(r#"[^.\[\]]*"#);
            }
        } else {
            regex.push_str(&regex::escape(&c.to_string()));
        }
    }

    regex.push('$');
    regex
}

/// Compiled set of attribute paths whose sequences are compared by index
#[derive(Debug, Clone)]
pub struct OrderedPaths {
    set: RegexSet,
}

impl OrderedPaths {
    /// Compile the configured patterns
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let set = RegexSet::new(patterns.iter().map(|p| pattern_to_regex(p.as_ref())))?;
        Ok(Self { set })
    }

    /// No ordered paths
    pub fn none() -> Self {
        Self {
            set: RegexSet::empty(),
        }
    }

    /// Whether the sequence at `path` must be compared by index
    pub fn matches(&self, path: &str) -> bool {
        self.set.is_match(path)
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl Default for OrderedPaths {
    fn default() -> Self {
        Self::none()
    }
}
