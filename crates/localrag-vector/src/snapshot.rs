//! Persist one `(vectors, chunks, metric)` tuple as a LanceDB directory.
//!
//! Layout: table `chunks` holds one row per entry (`position` restores the
//! order on load) and table `meta` holds `metric`, `dim` and `count`. Vectors
//! are written in stored form, so a loaded index scores bit-for-bit like the
//! saved one. Saving writes a sibling staging directory and swaps it in, so an
//! existing snapshot survives a failed save.

use anyhow::{anyhow, Context};
use arrow_array::cast::AsArray;
use arrow_array::{Array, FixedSizeListArray, Int64Array, RecordBatch, RecordBatchIterator, StringArray};
use futures::TryStreamExt;
use lancedb::query::ExecutableQuery;
use lancedb::{connect, Connection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use localrag_core::error::{Error, Result};
use localrag_core::types::{Chunk, Metric};

use crate::index::VectorIndex;
use crate::schema::{build_chunks_schema, build_meta_schema, CHUNKS_TABLE, META_TABLE};

pub fn save(index: &VectorIndex<Chunk>, dir: &Path) -> Result<()> {
    let dim = match index.dim() {
        Some(d) if !index.is_empty() => d,
        _ => return Err(Error::EmptyIndex),
    };
    let staging = sibling(dir, "staging")?;
    if staging.exists() { std::fs::remove_dir_all(&staging)?; }
    std::fs::create_dir_all(&staging)?;
    let rt = tokio::runtime::Runtime::new()?;
    if let Err(e) = rt.block_on(save_async(index, dim, &staging)) {
        if let Err(cleanup) = std::fs::remove_dir_all(&staging) {
            warn!(path = %staging.display(), error = %cleanup, "could not remove staging directory");
        }
        return Err(snapshot_error(e));
    }
    swap_into_place(&staging, dir)?;
    info!(count = index.len(), dim, metric = %index.metric(), path = %dir.display(), "saved index snapshot");
    Ok(())
}

pub fn load(dir: &Path) -> Result<VectorIndex<Chunk>> {
    if !dir.exists() {
        return Err(Error::SourceNotFound(format!("snapshot {} does not exist", dir.display())));
    }
    let rt = tokio::runtime::Runtime::new()?;
    let (metric, vectors, chunks) = rt.block_on(load_async(dir)).map_err(snapshot_error)?;
    let index = VectorIndex::from_stored(metric, vectors, chunks)?;
    info!(count = index.len(), metric = %index.metric(), path = %dir.display(), "loaded index snapshot");
    Ok(index)
}

fn snapshot_error(e: anyhow::Error) -> Error { Error::Snapshot(format!("{e:#}")) }

/// `.<name>.<tag>` next to `dir`.
fn sibling(dir: &Path, tag: &str) -> Result<PathBuf> {
    let name = dir
        .file_name()
        .ok_or_else(|| Error::InvalidConfig(format!("snapshot path {} has no directory name", dir.display())))?;
    Ok(dir.with_file_name(format!(".{}.{tag}", name.to_string_lossy())))
}

/// Replace `dir` with the fully written `staging` directory. The previous
/// snapshot is only deleted once the new one is in place.
fn swap_into_place(staging: &Path, dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::rename(staging, dir)?;
        return Ok(());
    }
    let retired = sibling(dir, "old")?;
    if retired.exists() { std::fs::remove_dir_all(&retired)?; }
    std::fs::rename(dir, &retired)?;
    if let Err(e) = std::fs::rename(staging, dir) {
        std::fs::rename(&retired, dir)?;
        return Err(e.into());
    }
    std::fs::remove_dir_all(&retired)?;
    Ok(())
}

async fn open_db(dir: &Path) -> anyhow::Result<Connection> {
    Ok(connect(dir.to_string_lossy().as_ref()).execute().await?)
}

async fn save_async(index: &VectorIndex<Chunk>, dim: usize, dir: &Path) -> anyhow::Result<()> {
    let db = open_db(dir).await?;
    let dim_i32 = i32::try_from(dim).context("vector dimension does not fit the Arrow schema")?;

    let mut positions = Vec::with_capacity(index.len());
    let mut source_indices = Vec::with_capacity(index.len());
    let mut source_offsets = Vec::with_capacity(index.len());
    let mut texts = Vec::with_capacity(index.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(index.len());
    for (position, (vector, chunk)) in index.entries().enumerate() {
        positions.push(i64::try_from(position).context("entry position overflows i64")?);
        source_indices.push(i64::try_from(chunk.source_index).context("source index overflows i64")?);
        source_offsets.push(i64::try_from(chunk.source_offset).context("source offset overflows i64")?);
        texts.push(chunk.text.clone());
        vectors.push(Some(vector.iter().map(|&x| Some(x)).collect()));
    }
    let schema = build_chunks_schema(dim_i32);
    let batch = RecordBatch::try_new(schema.clone(), vec![
        Arc::new(Int64Array::from(positions)),
        Arc::new(Int64Array::from(source_indices)),
        Arc::new(Int64Array::from(source_offsets)),
        Arc::new(StringArray::from(texts)),
        Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), dim_i32)),
    ])?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
    db.create_table(CHUNKS_TABLE, reader).execute().await?;

    let meta = [
        ("metric", index.metric().as_str().to_string()),
        ("dim", dim.to_string()),
        ("count", index.len().to_string()),
    ];
    let meta_schema = build_meta_schema();
    let batch = RecordBatch::try_new(meta_schema.clone(), vec![
        Arc::new(StringArray::from(meta.iter().map(|(k, _)| k.to_string()).collect::<Vec<_>>())),
        Arc::new(StringArray::from(meta.iter().map(|(_, v)| v.clone()).collect::<Vec<_>>())),
    ])?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), meta_schema));
    db.create_table(META_TABLE, reader).execute().await?;
    Ok(())
}

type Loaded = (Metric, Vec<Vec<f32>>, Vec<Chunk>);

async fn load_async(dir: &Path) -> anyhow::Result<Loaded> {
    let db = open_db(dir).await?;
    let meta = read_meta(&db).await?;
    let metric: Metric = meta.get("metric").ok_or_else(|| anyhow!("meta.metric missing"))?.parse()?;
    let dim: usize = meta.get("dim").ok_or_else(|| anyhow!("meta.dim missing"))?.parse()?;
    let count: usize = meta.get("count").ok_or_else(|| anyhow!("meta.count missing"))?.parse()?;

    let table = db.open_table(CHUNKS_TABLE).execute().await?;
    let mut rows: Vec<(i64, Vec<f32>, Chunk)> = Vec::with_capacity(count);
    let mut stream = table.query().execute().await?;
    while let Some(batch) = stream.try_next().await? {
        let positions = int64_column(&batch, "position")?;
        let source_indices = int64_column(&batch, "source_index")?;
        let source_offsets = int64_column(&batch, "source_offset")?;
        let texts = batch
            .column_by_name("text")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| anyhow!("chunks.text column missing"))?;
        let vecs = batch
            .column_by_name("vector")
            .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
            .ok_or_else(|| anyhow!("chunks.vector column missing"))?;
        for i in 0..batch.num_rows() {
            if !vecs.is_valid(i) { return Err(anyhow!("row {} has no vector", positions.value(i))); }
            let vector: Vec<f32> = vecs.value(i).as_primitive::<arrow_array::types::Float32Type>().values().iter().copied().collect();
            if vector.len() != dim { return Err(anyhow!("row {} has {} dims, expected {}", positions.value(i), vector.len(), dim)); }
            let chunk = Chunk::new(
                texts.value(i),
                usize::try_from(source_indices.value(i))?,
                usize::try_from(source_offsets.value(i))?,
            );
            rows.push((positions.value(i), vector, chunk));
        }
    }
    if rows.len() != count {
        return Err(anyhow!("snapshot holds {} rows, meta says {}", rows.len(), count));
    }
    rows.sort_by_key(|(position, _, _)| *position);
    let (vectors, chunks) = rows.into_iter().map(|(_, v, c)| (v, c)).unzip();
    Ok((metric, vectors, chunks))
}

async fn read_meta(db: &Connection) -> anyhow::Result<HashMap<String, String>> {
    let table = db.open_table(META_TABLE).execute().await?;
    let mut out = HashMap::new();
    let mut stream = table.query().execute().await?;
    while let Some(batch) = stream.try_next().await? {
        let keys = batch.column_by_name("key").and_then(|c| c.as_any().downcast_ref::<StringArray>()).ok_or_else(|| anyhow!("meta.key column missing"))?;
        let values = batch.column_by_name("value").and_then(|c| c.as_any().downcast_ref::<StringArray>()).ok_or_else(|| anyhow!("meta.value column missing"))?;
        for i in 0..batch.num_rows() { out.insert(keys.value(i).to_string(), values.value(i).to_string()); }
    }
    Ok(out)
}

fn int64_column<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a Int64Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
        .ok_or_else(|| anyhow!("chunks.{name} column missing"))
}
