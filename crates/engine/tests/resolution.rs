//! End-to-end tests over the shipped catalog, using the deterministic stub
//! embedder so no model files are required.

use std::sync::Arc;
use triz_engine::{
    resolve_contradiction, resolver, EmbeddingIndex, RawContradiction, StubEmbedder,
};
use triz_taxonomy::Catalog;

async fn shipped_index() -> (&'static Catalog, EmbeddingIndex) {
    let catalog = Catalog::load().expect("embedded catalog loads");
    let index = EmbeddingIndex::build(Arc::new(StubEmbedder::default()), catalog)
        .await
        .expect("index builds");
    (catalog, index)
}

fn ids(principles: &[triz_taxonomy::Principle]) -> Vec<u32> {
    principles.iter().map(|p| p.id).collect()
}

#[test]
fn shipped_matrix_is_directional() {
    let catalog = Catalog::load().unwrap();

    // Improving weight of a moving object (1) while speed (9) degrades is
    // not the same cell as the reverse direction.
    let forward = resolver::resolve(catalog, &[1], &[9]).unwrap();
    let backward = resolver::resolve(catalog, &[9], &[1]).unwrap();

    assert_eq!(ids(&forward), vec![2, 8, 15, 38]);
    assert_eq!(ids(&backward), vec![2, 13, 28, 38]);
}

#[test]
fn shipped_matrix_self_pair_is_empty() {
    let catalog = Catalog::load().unwrap();
    assert!(resolver::resolve(catalog, &[5], &[5]).unwrap().is_empty());
}

#[test]
fn shipped_matrix_union_matches_single_lookups() {
    let catalog = Catalog::load().unwrap();

    let combined = resolver::resolve(catalog, &[1, 2], &[10]).unwrap();
    let first = resolver::resolve(catalog, &[1], &[10]).unwrap();
    let second = resolver::resolve(catalog, &[2], &[10]).unwrap();

    let mut expected: Vec<u32> = ids(&first);
    expected.extend(ids(&second));
    expected.sort_unstable();
    expected.dedup();

    assert_eq!(ids(&combined), expected);
    // Known cells: (1,10) -> 8,10,18,37 and (2,10) -> 8,10,19,35; both
    // contribute, so the union is strictly larger than either cell.
    assert_eq!(ids(&combined), vec![8, 10, 18, 19, 35, 37]);
    assert!(ids(&first).len() < ids(&combined).len());
    assert!(ids(&second).len() < ids(&combined).len());
}

#[tokio::test]
async fn search_clamps_to_full_taxonomy() {
    let (_, index) = shipped_index().await;

    let parameters = index.search_parameters("weight", 1000).await.unwrap();
    assert_eq!(parameters.len(), 39);

    let principles = index.search_principles("separation", 1000).await.unwrap();
    assert_eq!(principles.len(), 40);
    for pair in principles.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn search_is_reproducible() {
    let (_, index) = shipped_index().await;
    let first = index.search_parameters("weight", 3).await.unwrap();
    let second = index.search_parameters("weight", 3).await.unwrap();

    let first_ids: Vec<u32> = first.iter().map(|m| m.parameter.id).collect();
    let second_ids: Vec<u32> = second.iter().map(|m| m.parameter.id).collect();
    assert_eq!(first_ids, second_ids);
}

#[tokio::test]
async fn pipeline_is_reproducible_from_its_parts() {
    let (catalog, index) = shipped_index().await;

    let raw = RawContradiction {
        action: "increase motor RPM".to_string(),
        positive_effect: "higher output speed".to_string(),
        negative_effect: "increased device temperature".to_string(),
    };

    let resolved = resolve_contradiction(&index, catalog, raw.clone(), 2)
        .await
        .unwrap();

    // Independently rerun the two searches and the matrix lookup; the
    // pipeline must be exactly their composition.
    let improve = index.search_parameters(&raw.positive_effect, 2).await.unwrap();
    let preserve = index.search_parameters(&raw.negative_effect, 2).await.unwrap();
    let improve_ids: Vec<u32> = improve.iter().map(|m| m.parameter.id).collect();
    let preserve_ids: Vec<u32> = preserve.iter().map(|m| m.parameter.id).collect();

    assert_eq!(resolved.parameters_to_improve, improve_ids);
    assert_eq!(resolved.parameters_to_preserve, preserve_ids);
    assert_eq!(improve_ids.len(), 2);
    assert_eq!(preserve_ids.len(), 2);

    let improving: Vec<i64> = improve_ids.iter().map(|&id| i64::from(id)).collect();
    let preserving: Vec<i64> = preserve_ids.iter().map(|&id| i64::from(id)).collect();
    let principles = resolver::resolve(catalog, &improving, &preserving).unwrap();
    let names: Vec<String> = principles.into_iter().map(|p| p.name).collect();

    assert_eq!(resolved.principles, names);
    assert_eq!(resolved.action, "increase motor RPM");
}

#[tokio::test]
async fn pipeline_propagates_search_failure() {
    let (catalog, index) = shipped_index().await;

    let raw = RawContradiction {
        action: "a".to_string(),
        positive_effect: "b".to_string(),
        negative_effect: "c".to_string(),
    };

    // max_parameters of zero violates the search contract; no partially
    // populated contradiction comes back.
    assert!(resolve_contradiction(&index, catalog, raw, 0).await.is_err());
}
