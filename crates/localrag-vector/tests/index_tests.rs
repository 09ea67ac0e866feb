use localrag_core::{Chunk, Embedder, Error, Metric};
use localrag_embed::HashEmbedder;
use localrag_vector::VectorIndex;

fn docs() -> Vec<String> {
    [
        "Paris is the capital of France.",
        "London is the capital of the UK.",
        "Rust guarantees memory safety without garbage collection.",
        "Photosynthesis converts light into chemical energy.",
        "The Nile is the longest river in Africa.",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[test]
fn self_retrieval_is_exact_for_both_metrics() {
    let embedder = HashEmbedder::new(512);
    let docs = docs();
    let vectors = embedder.embed_batch(&docs).unwrap();
    for metric in [Metric::L2, Metric::Cosine] {
        let mut index = VectorIndex::new(metric);
        index.build(vectors.clone(), docs.clone()).unwrap();
        for (i, v) in vectors.iter().enumerate() {
            let hits = index.search(v, 1).unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].id, i, "metric={metric} doc={i}");
        }
    }
}

#[test]
fn returns_min_k_count_best_first() {
    let embedder = HashEmbedder::new(512);
    let docs = docs();
    let vectors = embedder.embed_batch(&docs).unwrap();
    let query = embedder.embed_text("capital city of France");

    let mut l2 = VectorIndex::new(Metric::L2);
    l2.build(vectors.clone(), docs.clone()).unwrap();
    let hits = l2.search(&query, 3).unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits.windows(2).all(|w| w[0].score <= w[1].score), "L2 ascending");
    assert_eq!(l2.search(&query, 50).unwrap().len(), docs.len());

    let mut cos = VectorIndex::new(Metric::Cosine);
    cos.build(vectors, docs.clone()).unwrap();
    let hits = cos.search(&query, 10).unwrap();
    assert_eq!(hits.len(), docs.len());
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score), "cosine descending");
    for h in &hits { assert!((-1.0..=1.0 + 1e-6).contains(&h.score)); }
}

#[test]
fn identical_vector_scores_one_under_cosine() {
    let mut index = VectorIndex::new(Metric::Cosine);
    index.build(vec![vec![3.0, 4.0], vec![-4.0, 3.0]], vec!["a", "b"]).unwrap();
    let hits = index.search(&[6.0, 8.0], 2).unwrap();
    assert_eq!(hits[0].id, 0);
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    assert!(hits[1].score.abs() < 1e-6, "orthogonal vectors score zero");
}

#[test]
fn l2_scores_are_squared_distances() {
    let mut index = VectorIndex::new(Metric::L2);
    index.build(vec![vec![0.0, 0.0], vec![3.0, 4.0]], vec!["origin", "far"]).unwrap();
    let hits = index.search_payloads(&[0.0, 0.0], 2).unwrap();
    assert_eq!(hits, vec![(&"origin", 0.0), (&"far", 25.0)]);
}

#[test]
fn ties_preserve_insertion_order() {
    let mut index = VectorIndex::new(Metric::L2);
    let v = vec![1.0, 1.0];
    index.build(vec![v.clone(), vec![5.0, 5.0], v.clone(), v.clone()], vec![0, 1, 2, 3]).unwrap();
    let ids: Vec<usize> = index.search(&v, 4).unwrap().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![0, 2, 3, 1]);
}

#[test]
fn mismatched_dimensions_are_rejected() {
    let mut index: VectorIndex<Chunk> = VectorIndex::new(Metric::L2);
    let err = index
        .build(vec![vec![1.0, 2.0], vec![1.0]], vec![Chunk::new("a", 0, 0), Chunk::new("b", 1, 0)])
        .unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 1, .. }), "got {err}");
    assert!(index.is_empty(), "nothing was silently truncated into the index");

    let err = index.build(vec![vec![1.0]], vec![]).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { .. }));

    index.build(vec![vec![1.0, 2.0]], vec![Chunk::new("a", 0, 0)]).unwrap();
    let err = index.search(&[1.0, 2.0, 3.0], 1).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3, .. }));
}

#[test]
fn zero_vectors_fail_under_cosine_only() {
    let mut cos = VectorIndex::new(Metric::Cosine);
    assert!(matches!(cos.build(vec![vec![0.0, 0.0]], vec!["z"]), Err(Error::ZeroVector(_))));
    cos.build(vec![vec![1.0, 0.0]], vec!["x"]).unwrap();
    assert!(matches!(cos.search(&[0.0, 0.0], 1), Err(Error::ZeroVector(_))));

    let mut l2 = VectorIndex::new(Metric::L2);
    l2.build(vec![vec![0.0, 0.0]], vec!["z"]).unwrap();
    assert_eq!(l2.search(&[0.0, 0.0], 1).unwrap()[0].score, 0.0);
}

#[test]
fn rebuild_replaces_previous_contents() {
    let mut index = VectorIndex::new(Metric::L2);
    index.build(vec![vec![1.0], vec![2.0]], vec!["a", "b"]).unwrap();
    index.build(vec![vec![1.0, 0.0]], vec!["c"]).unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index.dim(), Some(2));
    assert_eq!(index.search_payloads(&[1.0, 0.0], 5).unwrap(), vec![(&"c", 0.0)]);
}
