//! Ownership-transition replay, shared by `coderisk-phase1`'s baseline
//! ownership metric and the agent's `get_ownership_timeline` tool so the
//! arithmetic lives once rather than being duplicated at each call site.
//!
//! Mirrors the original Go implementation's `temporal` package: replay each
//! commit touching a file in chronological order, track which developer's
//! running count leads after each one, and report when the *current* top
//! owner (by total commit count) most recently overtook whoever led before.

use crate::{CommitSummary, OwnerEntry};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Returns `(transition_date, days_since_transition)` for the current top
/// owner (`owners[0]`), derived by replaying `commits` oldest-to-newest.
/// `commits` is whatever bounded window the caller fetched (`get_recent_commits`
/// is capped at 50 — spec.md §4.4's explicit-LIMIT rule), so a transition
/// further back than that window will not be detected and this returns
/// `(None, None)` instead of a stale date.
pub fn compute_transition(
    owners: &[OwnerEntry],
    commits: &[CommitSummary],
) -> (Option<DateTime<Utc>>, Option<i64>) {
    let Some(top) = owners.first() else {
        return (None, None);
    };

    let mut ordered: Vec<&CommitSummary> = commits.iter().collect();
    ordered.sort_by_key(|c| c.committed_at);

    let mut counts: HashMap<&str, u32> = HashMap::new();
    let mut leader: Option<&str> = None;
    let mut transition_at: Option<DateTime<Utc>> = None;

    for commit in ordered {
        let count = {
            let entry = counts.entry(commit.author_email.as_str()).or_insert(0);
            *entry += 1;
            *entry
        };
        match leader {
            None => leader = Some(commit.author_email.as_str()),
            Some(current) if current != commit.author_email.as_str() => {
                let leader_count = counts.get(current).copied().unwrap_or(0);
                if count > leader_count {
                    leader = Some(commit.author_email.as_str());
                    transition_at = Some(commit.committed_at);
                }
            }
            _ => {}
        }
    }

    match (leader, transition_at) {
        (Some(final_leader), Some(at)) if final_leader == top.email => {
            (Some(at), Some((Utc::now() - at).num_days().max(0)))
        }
        _ => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(email: &str, commits: u32) -> OwnerEntry {
        OwnerEntry {
            email: email.to_string(),
            commit_count: commits,
            last_commit: Utc::now(),
            is_active: true,
            days_since_commit: 1,
            author_association: None,
        }
    }

    fn commit(email: &str, days_ago: i64) -> CommitSummary {
        CommitSummary {
            sha: format!("{email}-{days_ago}"),
            message: "msg".to_string(),
            author_email: email.to_string(),
            committed_at: Utc::now() - chrono::Duration::days(days_ago),
        }
    }

    #[test]
    fn detects_the_overtake_that_produced_the_current_top_owner() {
        let owners = vec![owner("b@x.com", 3), owner("a@x.com", 2)];
        // a: 2 commits (day 100, 90). b: 3 commits (day 50, 40, 30).
        // Running counts: a=1(100) a=2(90) b=1(50, tie 2-1 still a) b=2(40, ties
        // 2-2, not a strict overtake) b=3(30, overtakes a's 2) -> transition at
        // day 30.
        let commits = vec![
            commit("a@x.com", 100),
            commit("a@x.com", 90),
            commit("b@x.com", 50),
            commit("b@x.com", 40),
            commit("b@x.com", 30),
        ];
        let expected_transition = commit("b@x.com", 30).committed_at;
        let (date, days) = compute_transition(&owners, &commits);
        assert_eq!(date, Some(expected_transition));
        assert!(days.unwrap() >= 29);
    }

    #[test]
    fn single_developer_has_no_transition() {
        let owners = vec![owner("a@x.com", 3)];
        let commits = vec![commit("a@x.com", 10), commit("a@x.com", 5), commit("a@x.com", 1)];
        let (date, days) = compute_transition(&owners, &commits);
        assert!(date.is_none());
        assert!(days.is_none());
    }

    #[test]
    fn no_commits_yields_no_transition() {
        let owners = vec![owner("a@x.com", 3)];
        let (date, days) = compute_transition(&owners, &[]);
        assert!(date.is_none());
        assert!(days.is_none());
    }

    #[test]
    fn no_owners_yields_no_transition() {
        let (date, days) = compute_transition(&[], &[commit("a@x.com", 1)]);
        assert!(date.is_none());
        assert!(days.is_none());
    }

    #[test]
    fn replay_final_leader_mismatched_with_aggregate_top_owner_yields_none() {
        // Aggregate counts say `a` is top, but the bounded commit window only
        // shows `b` in the lead - the window is too short to explain the
        // aggregate, so no transition date is reported rather than a wrong one.
        let owners = vec![owner("a@x.com", 3), owner("b@x.com", 2)];
        let commits = vec![commit("b@x.com", 5), commit("b@x.com", 1)];
        let (date, days) = compute_transition(&owners, &commits);
        assert!(date.is_none());
        assert!(days.is_none());
    }
}
