pub const EXECUTION_NAME_PREFIX: &str = "SSM_Tool";
pub const MAX_EXECUTION_NAME_LEN: usize = 80;

/// Builds `SSM_Tool-<label>-<stamp>`, replacing characters the orchestrator rejects
/// and shortening the label so the whole name stays within 80 characters.
pub fn execution_name(label: &str, stamp: &str) -> String {
    let stamp = sanitize(stamp);
    let fixed_len = EXECUTION_NAME_PREFIX.len() + stamp.len() + 2;
    let budget = MAX_EXECUTION_NAME_LEN.saturating_sub(fixed_len);

    let mut label: String = sanitize(label).chars().take(budget).collect();
    if label.is_empty() {
        label.push_str("job");
        label.truncate(budget);
    }

    let name = format!("{EXECUTION_NAME_PREFIX}-{label}-{stamp}");
    name.chars().take(MAX_EXECUTION_NAME_LEN).collect()
}

fn sanitize(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_prefixed_name() {
        assert_eq!(
            execution_name("create_ami_ids", "20240102030405123456"),
            "SSM_Tool-create_ami_ids-20240102030405123456"
        );
    }

    #[test]
    fn replaces_disallowed_characters() {
        assert_eq!(
            execution_name("jobs/fix tags.v2", "1"),
            "SSM_Tool-jobs_fix_tags_v2-1"
        );
    }

    #[test]
    fn long_labels_are_shortened_but_stamp_is_kept() {
        let label = "x".repeat(200);
        let name = execution_name(&label, "20240102030405123456");
        assert_eq!(name.len(), MAX_EXECUTION_NAME_LEN);
        assert!(name.ends_with("-20240102030405123456"));
    }

    #[test]
    fn empty_label_falls_back_to_job() {
        assert_eq!(execution_name("  ", "7"), "SSM_Tool-job-7");
    }
}
