use coderisk_core::RiskLevel;

const KEYWORDS: &[&str] = &[
    "auth", "login", "token", "jwt", "oauth", "encrypt", "hash", "password", "salt", "permission",
    "role", "admin", "sanitize", "pii",
];

const PATH_PATTERNS: &[&str] = &["auth", "security", "permission", "credential", "secrets"];

#[derive(Debug, Clone, PartialEq)]
pub struct SecurityFinding {
    pub risk: RiskLevel,
    pub force_escalate: bool,
    pub matched_keywords: Vec<String>,
    pub path_matched: bool,
}

/// Case-insensitive, word-boundary / CamelCase-aware keyword scan plus a
/// path-pattern check, combined per the §4.1 security policy table.
pub fn classify(path: &str, content_or_diff: &str) -> SecurityFinding {
    let path_matched = path_matches(path);
    let matched_keywords = matched_keywords(content_or_diff);
    let keyword_count = matched_keywords.len();

    let (risk, force_escalate) = if path_matched && keyword_count >= 1 {
        (RiskLevel::Critical, true)
    } else if keyword_count >= 3 {
        (RiskLevel::Critical, true)
    } else if path_matched {
        (RiskLevel::High, true)
    } else if keyword_count >= 2 {
        (RiskLevel::High, true)
    } else if keyword_count == 1 {
        (RiskLevel::High, false)
    } else {
        (RiskLevel::Minimal, false)
    };

    SecurityFinding {
        risk,
        force_escalate,
        matched_keywords,
        path_matched,
    }
}

fn path_matches(path: &str) -> bool {
    let lower = path.to_lowercase();
    PATH_PATTERNS.iter().any(|p| lower.contains(p))
}

fn matched_keywords(content: &str) -> Vec<String> {
    let words = tokenize(content);
    let mut found = Vec::new();
    for keyword in KEYWORDS {
        if words.iter().any(|w| w == keyword) && !found.contains(&keyword.to_string()) {
            found.push(keyword.to_string());
        }
    }
    found
}

/// Splits on non-alphanumeric boundaries and CamelCase humps, lower-cased,
/// so `JWTToken`, `jwt_token`, and `jwt-token` all surface the `jwt` and
/// `token` keywords. Breaks at both hump transitions a CamelCase-aware
/// splitter needs: a lower→upper boundary (`camelCase` → `camel`, `Case`)
/// and an upper-run→lower boundary, splitting before the last uppercase
/// char of a run when it is followed by a lowercase char (`JWTToken` →
/// `JWT`, `Token`; `PIIField` → `PII`, `Field`), so an acronym prefix
/// doesn't collapse into the word that follows it.
fn tokenize(content: &str) -> Vec<String> {
    let chars: Vec<char> = content.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_alphanumeric() {
            let prev = current.chars().last();
            let prev_lower = prev.map(|c| c.is_lowercase()).unwrap_or(false);
            let prev_upper = prev.map(|c| c.is_uppercase()).unwrap_or(false);
            let next_lower = chars.get(i + 1).map(|c| c.is_lowercase()).unwrap_or(false);

            if ch.is_uppercase() && !current.is_empty() && (prev_lower || (prev_upper && next_lower)) {
                words.push(std::mem::take(&mut current).to_lowercase());
            }
            current.push(ch);
        } else if !current.is_empty() {
            words.push(std::mem::take(&mut current).to_lowercase());
        }
    }
    if !current.is_empty() {
        words.push(current.to_lowercase());
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_pattern_alone_forces_high_escalation() {
        let finding = classify("internal/auth/helpers.go", "nothing interesting here");
        assert_eq!(finding.risk, RiskLevel::High);
        assert!(finding.force_escalate);
    }

    #[test]
    fn path_and_keyword_is_critical() {
        let finding = classify("internal/auth/login.go", "validate jwt token");
        assert_eq!(finding.risk, RiskLevel::Critical);
        assert!(finding.force_escalate);
    }

    #[test]
    fn three_keywords_without_path_match_is_critical() {
        let finding = classify(
            "src/utils.rs",
            "hashPassword(salt, token)",
        );
        assert_eq!(finding.risk, RiskLevel::Critical);
        assert!(finding.force_escalate);
    }

    #[test]
    fn single_keyword_is_high_without_forced_escalation() {
        let finding = classify("src/utils.rs", "let token = read_token();");
        assert_eq!(finding.risk, RiskLevel::High);
        assert!(!finding.force_escalate);
    }

    #[test]
    fn no_keywords_is_minimal() {
        let finding = classify("src/utils.rs", "let total = compute_sum(values);");
        assert_eq!(finding.risk, RiskLevel::Minimal);
        assert!(!finding.force_escalate);
    }

    #[test]
    fn camel_case_keyword_is_detected() {
        let finding = classify("src/utils.rs", "struct JWTToken { value: String }");
        assert!(finding.matched_keywords.contains(&"jwt".to_string()));
        assert!(finding.matched_keywords.contains(&"token".to_string()));
    }
}
