use coderisk_core::ModificationType;

const IMPORT_MARKERS: &[&str] = &["import ", "use ", "require(", "#include"];
const CONTROL_FLOW_KEYWORDS: &[&str] = &["if ", "else", "for ", "while ", "match ", "switch "];
const CONTROL_FLOW_THRESHOLD: usize = 3;
const API_MARKERS: &[&str] = &["router.", "@app.route", "#[get(", "#[post(", "endpoint", "handler"];
const TEST_DIR_MARKERS: &[&str] = &["/test/", "/tests/", "__tests__/"];
const TEST_FILE_MARKERS: &[&str] = &["_test.", "test_", ".test.", ".spec."];

/// Multi-label classification over `(path, content_or_diff)`. Each label is
/// assigned independently by a content/path heuristic; several may apply to
/// the same file.
pub fn classify(path: &str, content_or_diff: &str) -> Vec<ModificationType> {
    let lower_path = path.to_lowercase();
    let lower_content = content_or_diff.to_lowercase();
    let mut labels = Vec::new();

    if is_test_file(&lower_path) {
        labels.push(ModificationType::TestQuality);
    }
    if IMPORT_MARKERS.iter().any(|m| lower_content.contains(m)) {
        labels.push(ModificationType::Structural);
    }
    if count_control_flow(&lower_content) >= CONTROL_FLOW_THRESHOLD {
        labels.push(ModificationType::Behavioral);
    }
    if API_MARKERS.iter().any(|m| lower_content.contains(m)) {
        labels.push(ModificationType::Interface);
    }

    labels
}

/// Picks the highest-priority label from a label set, per the base-risk
/// priority table (ties keep the first-encountered label).
pub fn primary_label(labels: &[ModificationType]) -> Option<ModificationType> {
    labels
        .iter()
        .copied()
        .max_by_key(|l| l.priority())
}

fn is_test_file(lower_path: &str) -> bool {
    TEST_DIR_MARKERS.iter().any(|m| lower_path.contains(m))
        || TEST_FILE_MARKERS.iter().any(|m| lower_path.contains(m))
}

fn count_control_flow(lower_content: &str) -> usize {
    CONTROL_FLOW_KEYWORDS
        .iter()
        .map(|k| lower_content.matches(k).count())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imports_yield_structural_label() {
        let labels = classify("src/lib.rs", "use std::collections::HashMap;");
        assert!(labels.contains(&ModificationType::Structural));
    }

    #[test]
    fn control_flow_heavy_diff_yields_behavioral_label() {
        let content = "if a {} else if b {} for x in y {} while z {}";
        let labels = classify("src/logic.rs", content);
        assert!(labels.contains(&ModificationType::Behavioral));
    }

    #[test]
    fn router_pattern_yields_interface_label() {
        let labels = classify("src/routes.rs", "router.get(\"/users\", handler)");
        assert!(labels.contains(&ModificationType::Interface));
    }

    #[test]
    fn test_file_shape_yields_test_quality_label() {
        let labels = classify("src/auth_test.rs", "fn it_works() {}");
        assert!(labels.contains(&ModificationType::TestQuality));
    }

    #[test]
    fn primary_label_picks_highest_priority() {
        let labels = vec![ModificationType::TestQuality, ModificationType::Interface];
        assert_eq!(primary_label(&labels), Some(ModificationType::Interface));
    }

    #[test]
    fn primary_label_of_empty_set_is_none() {
        assert_eq!(primary_label(&[]), None);
    }
}
