use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use secrecy::SecretString;
use team_stats::aggregator::aggregate;
use team_stats::api::{ContributionRecord, Credentials, RegisterDeveloperRequest, TeamDeveloper};
use team_stats::memory::MemoryStore;
use team_stats::{HandlerError, TeamDevelopersHandler};
use team_stats_app::AdminGateway;

const LOGINS: [&str; 6] = ["ada", "bea", "cy", "dot", "eve", "fin"];
const ROUNDS: u64 = 50;

fn roster() -> Vec<TeamDeveloper> {
    LOGINS
        .iter()
        .map(|login| RegisterDeveloperRequest::new(*login, "1").validate().unwrap().into())
        .collect()
}

fn random_timestamp(rng: &mut StdRng) -> Option<DateTime<Utc>> {
    if rng.gen_bool(0.2) {
        return None;
    }
    Utc.timestamp_opt(rng.gen_range(1_500_000_000..1_750_000_000), 0).single()
}

/// Up to 40 rows over the roster plus one stranger, a third of them untracked.
fn random_records(rng: &mut StdRng) -> Vec<ContributionRecord> {
    (0..rng.gen_range(0..40))
        .map(|repo| {
            let login = if rng.gen_bool(0.1) {
                "stranger"
            } else {
                LOGINS[rng.gen_range(0..LOGINS.len())]
            };
            ContributionRecord::new(
                login.to_string(),
                format!("repo_{}", repo),
                rng.gen_range(0..200),
                rng.gen_range(0..5_000),
                rng.gen_range(0..5_000),
                random_timestamp(rng),
                random_timestamp(rng),
                !rng.gen_bool(0.33),
            )
        })
        .collect()
}

#[test]
fn aggregation_properties() {
    for seed in 0..ROUNDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let records = random_records(&mut rng);
        let ranked = aggregate(roster(), &records);

        assert_eq!(ranked.len(), LOGINS.len(), "seed {}", seed);
        assert!(
            ranked.windows(2).all(|pair| pair[0].net_lines() >= pair[1].net_lines()),
            "seed {}: not ranked by net lines",
            seed
        );

        let tracked: Vec<ContributionRecord> = records.iter().filter(|r| r.is_tracked).cloned().collect();
        assert_eq!(ranked, aggregate(roster(), &tracked), "seed {}: untracked rows leaked", seed);

        for entry in &ranked {
            let stats = entry.stats.as_ref().unwrap();
            let own: Vec<&ContributionRecord> = tracked
                .iter()
                .filter(|r| r.github_login == entry.developer.github_login)
                .collect();
            assert_eq!(stats.net_lines, stats.total_additions as i64 - stats.total_deletions as i64);
            assert_eq!(stats.total_commits, own.iter().map(|r| r.total_commits).sum::<u64>());
            assert_eq!(stats.repositories_count, own.len() as u64);
            assert_eq!(stats.first_commit_at, own.iter().filter_map(|r| r.first_commit_at).min());
            assert_eq!(stats.last_commit_at, own.iter().filter_map(|r| r.last_commit_at).max());
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_admit_one() {
    const ATTEMPTS: usize = 16;
    let store = MemoryStore::default();
    let gateway = AdminGateway::new(Some(SecretString::new("token".to_string())), true);
    let handler = TeamDevelopersHandler::new(store.clone(), gateway);
    let credentials = Credentials::bearer("token");

    let results = join_all((0..ATTEMPTS).map(|attempt| {
        handler.register(
            &credentials,
            RegisterDeveloperRequest::new("octocat", attempt.to_string()),
        )
    }))
    .await;

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .all(|err| *err == HandlerError::DuplicateRegistration("octocat".to_string())));
    assert_eq!(store.developers().await.len(), 1);
}
