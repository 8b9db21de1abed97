//! Integration tests for publishing generated manifests through feature
//! branches and pull requests.

mod common;

use common::{config_repo, services_repo, StoreFixture};
use flux_onboarding::config::FluxConfig;
use flux_onboarding::phases::{GenerationRequest, PublishOutcome};
use flux_onboarding::store::StoreCall;
use flux_onboarding::teams::TeamConfigService;

fn count(calls: &[StoreCall], predicate: impl Fn(&StoreCall) -> bool) -> usize {
    calls.iter().filter(|c| predicate(c)).count()
}

#[test]
fn test_first_run_opens_one_pull_request() {
    let fixture = StoreFixture::new();
    let result = fixture.generate(GenerationRequest::new("snd", "ffc-demo"));

    assert!(result.is_success());
    assert!(matches!(
        result.outcome,
        PublishOutcome::PullRequestCreated { ref branch, .. } if branch == "features/ffc-demo"
    ));

    let calls = fixture.mutations();
    assert_eq!(count(&calls, |c| matches!(c, StoreCall::CreateCommit { .. })), 1);
    assert_eq!(count(&calls, |c| matches!(c, StoreCall::CreateBranch { .. })), 1);
    assert_eq!(count(&calls, |c| matches!(c, StoreCall::UpdateBranch { .. })), 0);
    assert_eq!(
        calls.last(),
        Some(&StoreCall::CreatePullRequest {
            repo: services_repo().name,
            branch: "features/ffc-demo".to_string(),
            base: "main".to_string(),
            title: "FFC-DEMO Manifest".to_string(),
        })
    );

    // The default branch is untouched until the pull request is merged.
    assert_eq!(fixture.published("main", "services/ffc/snd/01/kustomization.yaml"), None);
    assert!(fixture.published("features/ffc-demo", "README.md").is_some());
}

#[test]
fn test_rerun_without_changes_writes_nothing() {
    let fixture = StoreFixture::new();
    fixture.generate(GenerationRequest::new("snd", "ffc-demo"));
    fixture.store.clear_calls();

    let result = fixture.generate(GenerationRequest::new("snd", "ffc-demo"));

    assert!(result.is_success());
    assert_eq!(result.outcome, PublishOutcome::NoChanges);
    assert!(fixture.mutations().is_empty());
}

#[test]
fn test_config_change_updates_existing_branch() {
    let fixture = StoreFixture::new();
    let first = fixture.generate(GenerationRequest::new("snd", "ffc-demo"));
    let PublishOutcome::PullRequestCreated { commit: first_commit, .. } = first.outcome else {
        panic!("expected a pull request, got {}", first.outcome);
    };

    let repo = config_repo();
    TeamConfigService::new(fixture.store.as_ref(), &repo)
        .set_service_variables(
            "ffc-demo",
            "ffc-demo-claim",
            vec![FluxConfig::new("POSTGRES_DB", "ffc_demo_claims")],
        )
        .unwrap();
    fixture.store.clear_calls();

    let result = fixture.generate(GenerationRequest::new("snd", "ffc-demo"));

    let PublishOutcome::BranchUpdated { branch, commit } = result.outcome else {
        panic!("expected a branch update, got {}", result.outcome);
    };
    assert_eq!(branch, "features/ffc-demo");
    assert_ne!(commit, first_commit);

    let calls = fixture.mutations();
    assert_eq!(count(&calls, |c| matches!(c, StoreCall::UpdateBranch { .. })), 1);
    assert_eq!(count(&calls, |c| matches!(c, StoreCall::CreatePullRequest { .. })), 0);
    match &calls[0] {
        StoreCall::CreateCommit { paths, .. } => assert_eq!(
            paths,
            &vec!["services/ffc/ffc-demo/ffc-demo-claim/pre-deploy/snd/01/migration.yaml".to_string()]
        ),
        other => panic!("expected a commit first, got {:?}", other),
    }
}

#[test]
fn test_service_run_uses_its_own_branch() {
    let fixture = StoreFixture::new();
    let result = fixture.generate(GenerationRequest::new("snd", "ffc-demo").with_service("ffc-demo-web"));

    assert!(matches!(
        result.outcome,
        PublishOutcome::PullRequestCreated { ref branch, .. } if branch == "features/ffc-demo-ffc-demo-web"
    ));
    assert!(fixture.mutations().iter().any(|c| matches!(
        c,
        StoreCall::CreatePullRequest { title, .. } if title == "FFC-DEMO-WEB Manifest"
    )));
}

#[test]
fn test_refused_pull_request_is_reported() {
    let fixture = StoreFixture::rejecting_pull_requests();
    let result = fixture.generate(GenerationRequest::new("snd", "ffc-demo"));

    assert!(result.outcome.is_change());
    assert!(!result.is_success());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("FFC-DEMO Manifest"));
    assert!(fixture
        .published("features/ffc-demo", "services/ffc/snd/01/kustomization.yaml")
        .is_some());
}

#[test]
fn test_missing_team_publishes_nothing() {
    let fixture = StoreFixture::new();
    let result = fixture.generate(GenerationRequest::new("snd", "ffc-unknown"));

    assert!(!result.config_exists);
    assert!(fixture.store.calls().is_empty());
}

#[test]
fn test_result_serializes_to_json() {
    let fixture = StoreFixture::new();
    let result = fixture.generate(GenerationRequest::new("snd", "ffc-demo"));
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["configExists"], serde_json::json!(true));
    assert_eq!(json["outcome"]["kind"], serde_json::json!("pullRequestCreated"));
    assert_eq!(json["outcome"]["branch"], serde_json::json!("features/ffc-demo"));
    assert_eq!(json["paths"].as_array().unwrap().len(), result.paths.len());
}
