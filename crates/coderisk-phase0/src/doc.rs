const DOC_EXTENSIONS: &[&str] = &["md", "txt", "rst", "adoc", "markdown"];

const DOC_BASENAMES: &[&str] = &[
    "readme",
    "changelog",
    "contributing",
    "license",
    "authors",
    "code_of_conduct",
    "security",
    "support",
];

const COMMENT_PREFIXES: &[&str] = &[
    "//", "#", "/*", "*/", "*", "<!--", "-->", "--", ";", "\"\"\"", "'''",
];

/// True if `path` names a documentation file by extension or basename,
/// matched case-insensitively.
pub fn is_doc_only(path: &str) -> bool {
    let lower = path.to_lowercase();
    let file_name = lower.rsplit('/').next().unwrap_or(&lower);

    if let Some(ext) = file_name.rsplit('.').next() {
        if file_name.contains('.') && DOC_EXTENSIONS.contains(&ext) {
            return true;
        }
    }

    let stem = file_name.split('.').next().unwrap_or(file_name);
    DOC_BASENAMES.contains(&stem)
}

/// True iff the diff has at least one changed hunk line and every
/// non-metadata hunk line is blank or a recognised comment marker.
pub fn is_comment_only_diff(diff: &str) -> bool {
    let mut saw_change = false;
    for line in diff.lines() {
        if line.starts_with("+++") || line.starts_with("---") || line.starts_with("@@") {
            continue;
        }
        let Some(body) = line.strip_prefix('+').or_else(|| line.strip_prefix('-')) else {
            continue;
        };
        saw_change = true;
        let trimmed = body.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !COMMENT_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
            return false;
        }
    }
    saw_change
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readme_is_doc_only_case_insensitive() {
        assert!(is_doc_only("README.md"));
        assert!(is_doc_only("docs/CHANGELOG"));
        assert!(is_doc_only("LICENSE"));
    }

    #[test]
    fn source_file_is_not_doc_only() {
        assert!(!is_doc_only("src/main.rs"));
        assert!(!is_doc_only("internal/auth/login.go"));
    }

    #[test]
    fn diff_with_only_comment_lines_is_comment_only() {
        let diff = "@@ -1,2 +1,3 @@\n+// a new comment\n-# old comment\n unchanged\n";
        assert!(is_comment_only_diff(diff));
    }

    #[test]
    fn diff_touching_code_is_not_comment_only() {
        let diff = "@@ -1,2 +1,3 @@\n+// a comment\n+let x = 1;\n";
        assert!(!is_comment_only_diff(diff));
    }

    #[test]
    fn diff_with_no_changed_lines_is_not_comment_only() {
        assert!(!is_comment_only_diff(" unchanged line\n"));
    }
}
