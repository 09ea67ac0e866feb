use localrag_core::{chunk, Chunk, Embedder, Error, Metric};
use localrag_embed::HashEmbedder;
use localrag_vector::{snapshot, VectorIndex};
use tempfile::TempDir;

fn build(metric: Metric) -> VectorIndex<Chunk> {
    let texts = [
        "Paris is the capital of France. It sits on the Seine.",
        "London is the capital of the UK. The Thames runs through it.",
    ];
    let chunks = chunk(&texts, 24, 6).unwrap();
    let embedder = HashEmbedder::new(64);
    let vectors = embedder.embed_batch(&chunks.iter().map(|c| c.text.clone()).collect::<Vec<_>>()).unwrap();
    let mut index = VectorIndex::new(metric);
    index.build(vectors, chunks).unwrap();
    index
}

#[test]
fn snapshot_round_trip_is_exact() {
    for metric in [Metric::L2, Metric::Cosine] {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("snapshot");
        let index = build(metric);
        snapshot::save(&index, &dir).expect("save");

        let loaded = snapshot::load(&dir).expect("load");
        assert_eq!(loaded.metric(), metric);
        assert_eq!(loaded.len(), index.len());
        assert_eq!(loaded.dim(), index.dim());
        for ((v1, c1), (v2, c2)) in index.entries().zip(loaded.entries()) {
            assert_eq!(c1, c2, "chunk order preserved");
            let bits1: Vec<u32> = v1.iter().map(|x| x.to_bits()).collect();
            let bits2: Vec<u32> = v2.iter().map(|x| x.to_bits()).collect();
            assert_eq!(bits1, bits2, "vectors are bit-identical");
        }

        let query = index.vector(1).unwrap().to_vec();
        assert_eq!(index.search(&query, 3).unwrap(), loaded.search(&query, 3).unwrap());
    }
}

#[test]
fn save_replaces_existing_snapshot() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("snapshot");
    snapshot::save(&build(Metric::L2), &dir).unwrap();
    let mut small = VectorIndex::new(Metric::Cosine);
    small.build(vec![vec![0.0, 1.0]], vec![Chunk::new("only", 0, 0)]).unwrap();
    snapshot::save(&small, &dir).unwrap();
    let loaded = snapshot::load(&dir).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded.metric(), Metric::Cosine);
}

#[test]
fn save_leaves_no_staging_directories_behind() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("snapshot");
    snapshot::save(&build(Metric::L2), &dir).unwrap();
    snapshot::save(&build(Metric::Cosine), &dir).unwrap();
    let names: Vec<String> =
        std::fs::read_dir(tmp.path()).unwrap().map(|e| e.unwrap().file_name().to_string_lossy().into_owned()).collect();
    assert_eq!(names, vec!["snapshot".to_string()]);
}

#[test]
fn stale_staging_from_interrupted_save_is_replaced() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("snapshot");
    snapshot::save(&build(Metric::L2), &dir).unwrap();
    let stale = tmp.path().join(".snapshot.staging");
    std::fs::create_dir_all(stale.join("junk")).unwrap();

    snapshot::save(&build(Metric::Cosine), &dir).unwrap();
    assert!(!stale.exists());
    assert_eq!(snapshot::load(&dir).unwrap().metric(), Metric::Cosine);
}

#[test]
fn rejected_save_keeps_existing_snapshot() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("snapshot");
    let index = build(Metric::L2);
    snapshot::save(&index, &dir).unwrap();
    let empty: VectorIndex<Chunk> = VectorIndex::new(Metric::Cosine);
    assert!(snapshot::save(&empty, &dir).is_err());
    let loaded = snapshot::load(&dir).unwrap();
    assert_eq!(loaded.len(), index.len());
    assert_eq!(loaded.metric(), Metric::L2);
}

#[test]
fn empty_index_cannot_be_saved() {
    let tmp = TempDir::new().unwrap();
    let index: VectorIndex<Chunk> = VectorIndex::new(Metric::L2);
    assert!(matches!(snapshot::save(&index, tmp.path()), Err(Error::EmptyIndex)));
}

#[test]
fn missing_snapshot_is_not_found() {
    let tmp = TempDir::new().unwrap();
    assert!(matches!(snapshot::load(&tmp.path().join("absent")), Err(Error::SourceNotFound(_))));
}
