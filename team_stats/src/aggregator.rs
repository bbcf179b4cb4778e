//! Merges contribution rows into per-developer totals and ranks the roster by net lines.

use crate::api::{AggregatedDeveloperStats, ContributionRecord, TeamDeveloper, TeamDeveloperWithStats};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Returns every roster entry with its stats, sorted by `net_lines` descending, ties by `github_login` ascending.
///
/// # Arguments
/// * `roster` - Developers to report on; each one appears exactly once in the result
/// * `records` - Contribution rows. Rows of untracked repositories or of logins outside `roster` are ignored.
pub fn aggregate(roster: Vec<TeamDeveloper>, records: &[ContributionRecord]) -> Vec<TeamDeveloperWithStats> {
    let mut accumulators: HashMap<&str, Accumulator> = roster
        .iter()
        .map(|developer| (developer.github_login.as_str(), Accumulator::default()))
        .collect();

    for record in records.iter().filter(|record| record.is_tracked) {
        if let Some(accumulator) = accumulators.get_mut(record.github_login.as_str()) {
            accumulator.add(record);
        }
    }

    let mut stats: HashMap<String, AggregatedDeveloperStats> = accumulators
        .into_iter()
        .map(|(login, accumulator)| (login.to_string(), accumulator.into_stats()))
        .collect();

    let mut ranked: Vec<TeamDeveloperWithStats> = roster
        .into_iter()
        .map(|developer| {
            let stats = stats.remove(&developer.github_login).unwrap_or_default();
            TeamDeveloperWithStats {
                developer,
                stats: Some(stats),
            }
        })
        .collect();
    ranked.sort_by(by_net_lines_desc);
    ranked
}

fn by_net_lines_desc(a: &TeamDeveloperWithStats, b: &TeamDeveloperWithStats) -> Ordering {
    b.net_lines()
        .cmp(&a.net_lines())
        .then_with(|| a.developer.github_login.cmp(&b.developer.github_login))
}

#[derive(Default)]
struct Accumulator<'a> {
    total_commits: u64,
    total_additions: u64,
    total_deletions: u64,
    repositories: HashSet<&'a str>,
    first_commit_at: Option<DateTime<Utc>>,
    last_commit_at: Option<DateTime<Utc>>,
}

impl<'a> Accumulator<'a> {
    fn add(&mut self, record: &'a ContributionRecord) {
        self.total_commits = self.total_commits.saturating_add(record.total_commits);
        self.total_additions = self.total_additions.saturating_add(record.total_additions);
        self.total_deletions = self.total_deletions.saturating_add(record.total_deletions);
        self.repositories.insert(record.repository_id.as_str());
        self.first_commit_at = pick(self.first_commit_at, record.first_commit_at, std::cmp::min);
        self.last_commit_at = pick(self.last_commit_at, record.last_commit_at, std::cmp::max);
    }

    fn into_stats(self) -> AggregatedDeveloperStats {
        AggregatedDeveloperStats {
            total_commits: self.total_commits,
            total_additions: self.total_additions,
            total_deletions: self.total_deletions,
            net_lines: net_lines(self.total_additions, self.total_deletions),
            repositories_count: self.repositories.len() as u64,
            first_commit_at: self.first_commit_at,
            last_commit_at: self.last_commit_at,
        }
    }
}

/// `None` places no constraint, so the other side wins.
fn pick<T: Copy>(current: Option<T>, candidate: Option<T>, choose: fn(T, T) -> T) -> Option<T> {
    match (current, candidate) {
        (Some(current), Some(candidate)) => Some(choose(current, candidate)),
        (current, candidate) => current.or(candidate),
    }
}

fn net_lines(additions: u64, deletions: u64) -> i64 {
    let net = additions as i128 - deletions as i128;
    net.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RegisterDeveloperRequest;
    use chrono::TimeZone;

    fn developer(login: &str) -> TeamDeveloper {
        RegisterDeveloperRequest::new(login, format!("id-{}", login))
            .validate()
            .unwrap()
            .into()
    }

    fn day(y: i32, m: u32, d: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap())
    }

    fn record(login: &str, repo: &str, additions: u64, deletions: u64, tracked: bool) -> ContributionRecord {
        ContributionRecord::new(login.into(), repo.into(), 1, additions, deletions, None, None, tracked)
    }

    fn logins(ranked: &[TeamDeveloperWithStats]) -> Vec<&str> {
        ranked.iter().map(|entry| entry.developer.github_login.as_str()).collect()
    }

    #[test]
    fn alice_and_bob() {
        let records = vec![
            ContributionRecord::new("alice".into(), "repoA".into(), 12, 50, 10, day(2024, 1, 1), day(2024, 3, 1), true),
            ContributionRecord::new("alice".into(), "repoB".into(), 3, 5, 5, day(2024, 2, 1), day(2024, 2, 15), true),
        ];
        let ranked = aggregate(vec![developer("bob"), developer("alice")], &records);

        assert_eq!(logins(&ranked), vec!["alice", "bob"]);
        let alice = ranked[0].stats.as_ref().unwrap();
        assert_eq!(alice.total_commits, 15);
        assert_eq!(alice.total_additions, 55);
        assert_eq!(alice.total_deletions, 15);
        assert_eq!(alice.net_lines, 40);
        assert_eq!(alice.repositories_count, 2);
        assert_eq!(alice.first_commit_at, day(2024, 1, 1));
        assert_eq!(alice.last_commit_at, day(2024, 3, 1));

        assert_eq!(ranked[1].stats, Some(AggregatedDeveloperStats::default()));
    }

    #[test]
    fn untracked_rows_change_nothing() {
        let roster = vec![developer("alice"), developer("bob")];
        let tracked = vec![record("alice", "repoA", 10, 2, true), record("bob", "repoA", 4, 1, true)];
        let mut with_untracked = tracked.clone();
        with_untracked.push(ContributionRecord::new(
            "bob".into(),
            "secret".into(),
            99,
            1_000,
            0,
            day(2001, 1, 1),
            day(2030, 1, 1),
            false,
        ));

        assert_eq!(aggregate(roster.clone(), &tracked), aggregate(roster, &with_untracked));
    }

    #[test]
    fn rows_outside_roster_are_ignored() {
        let ranked = aggregate(vec![developer("alice")], &[record("mallory", "repoA", 500, 0, true)]);
        assert_eq!(logins(&ranked), vec!["alice"]);
        assert_eq!(ranked[0].net_lines(), 0);
    }

    #[test]
    fn net_lines_can_be_negative() {
        let ranked = aggregate(
            vec![developer("alice"), developer("bob")],
            &[record("alice", "repoA", 3, 30, true), record("bob", "repoA", 1, 1, true)],
        );
        assert_eq!(logins(&ranked), vec!["bob", "alice"]);
        assert_eq!(ranked[1].net_lines(), -27);
    }

    #[test]
    fn ties_ordered_by_login() {
        let ranked = aggregate(
            vec![developer("zed"), developer("amy"), developer("kim")],
            &[record("zed", "repoA", 5, 0, true), record("amy", "repoA", 5, 0, true)],
        );
        assert_eq!(logins(&ranked), vec!["amy", "zed", "kim"]);
    }

    #[test]
    fn null_timestamps_do_not_constrain() {
        let records = vec![
            ContributionRecord::new("alice".into(), "repoA".into(), 1, 1, 0, None, day(2024, 5, 1), true),
            ContributionRecord::new("alice".into(), "repoB".into(), 1, 1, 0, day(2024, 4, 1), None, true),
        ];
        let ranked = aggregate(vec![developer("alice")], &records);
        let stats = ranked[0].stats.as_ref().unwrap();
        assert_eq!(stats.first_commit_at, day(2024, 4, 1));
        assert_eq!(stats.last_commit_at, day(2024, 5, 1));
    }

    #[test]
    fn repositories_counted_once() {
        let ranked = aggregate(
            vec![developer("alice")],
            &[record("alice", "repoA", 1, 0, true), record("alice", "repoA", 1, 0, true)],
        );
        assert_eq!(ranked[0].stats.as_ref().unwrap().repositories_count, 1);
    }

    #[test]
    fn net_lines_saturate() {
        assert_eq!(net_lines(u64::MAX, 0), i64::MAX);
        assert_eq!(net_lines(0, u64::MAX), i64::MIN);
    }
}
