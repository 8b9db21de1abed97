//! Integration tests for merging shared aggregators with their published
//! state on the manifests repository's default branch.

mod common;

use common::StoreFixture;
use flux_onboarding::phases::GenerationRequest;
use serde_yaml::Value;

const TEAM_SND1: &str = "services/ffc/ffc-demo/snd/01/kustomization.yaml";
const PROGRAMME_SND1: &str = "services/ffc/snd/01/kustomization.yaml";
const PROGRAMME_SND2: &str = "services/ffc/snd/02/kustomization.yaml";

fn resources(fixture: &StoreFixture, branch: &str, path: &str) -> Vec<String> {
    let content = fixture.published(branch, path).unwrap();
    let value: Value = serde_yaml::from_str(&content).unwrap();
    value["resources"]
        .as_sequence()
        .unwrap()
        .iter()
        .map(|r| r.as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_new_aggregators_list_every_service() {
    let fixture = StoreFixture::new();
    fixture.generate(GenerationRequest::new("snd", "ffc-demo"));

    assert_eq!(
        resources(&fixture, "features/ffc-demo", TEAM_SND1),
        vec!["../../ffc-demo-web", "../../ffc-demo-claim", "../../ffc-demo-chart"]
    );
    assert_eq!(
        resources(&fixture, "features/ffc-demo", PROGRAMME_SND1),
        vec!["../../ffc-demo/snd/01"]
    );
    assert_eq!(
        resources(&fixture, "features/ffc-demo", PROGRAMME_SND2),
        vec!["../../ffc-demo/snd/02"]
    );
}

#[test]
fn test_published_entries_keep_their_order() {
    let fixture = StoreFixture::new().with_published(
        PROGRAMME_SND1,
        "apiVersion: kustomize.config.k8s.io/v1beta1\nkind: Kustomization\nresources:\n  - ../../ffc-grants/snd/01\n  - ../../ffc-pay/snd/01\n",
    );
    fixture.generate(GenerationRequest::new("snd", "ffc-demo"));

    assert_eq!(
        resources(&fixture, "features/ffc-demo", PROGRAMME_SND1),
        vec!["../../ffc-grants/snd/01", "../../ffc-pay/snd/01", "../../ffc-demo/snd/01"]
    );
}

#[test]
fn test_single_service_merges_into_published_team_list() {
    let fixture = StoreFixture::new().with_published(
        TEAM_SND1,
        "resources:\n  - ../../ffc-demo-web\n",
    );
    fixture.generate(GenerationRequest::new("snd", "ffc-demo").with_service("ffc-demo-claim"));

    assert_eq!(
        resources(&fixture, "features/ffc-demo-ffc-demo-claim", TEAM_SND1),
        vec!["../../ffc-demo-web", "../../ffc-demo-claim"]
    );
}

#[test]
fn test_reference_already_published_is_not_duplicated() {
    let fixture = StoreFixture::new().with_published(
        TEAM_SND1,
        "resources:\n  - ../../ffc-demo-claim\n  - ../../ffc-demo-web\n",
    );
    fixture.generate(GenerationRequest::new("snd", "ffc-demo").with_service("ffc-demo-web"));

    assert_eq!(
        resources(&fixture, "features/ffc-demo-ffc-demo-web", TEAM_SND1),
        vec!["../../ffc-demo-claim", "../../ffc-demo-web"]
    );
}
