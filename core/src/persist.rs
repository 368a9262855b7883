use crate::error::{Result, SimError};
use crate::vector::FrequencyVector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

pub const SNAPSHOT_VERSION: u32 = 1;

pub type VectorMap = HashMap<String, FrequencyVector>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
}

impl MetaFile {
    /// Meta for a snapshot of `num_docs` documents written now.
    pub fn now(num_docs: usize) -> Self {
        Self {
            num_docs: num_docs as u32,
            created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
            version: SNAPSHOT_VERSION,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotPaths {
    pub root: PathBuf,
}

impl SnapshotPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn vectors(&self) -> PathBuf { self.root.join("vectors.bin") }
    pub fn ids(&self) -> PathBuf { self.root.join("urls.txt") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut f = File::open(path).map_err(|e| SimError::io(path, e))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).map_err(|e| SimError::io(path, e))?;
    Ok(buf)
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir).map_err(|e| SimError::io(dir, e))?;
    }
    let mut f = File::create(path).map_err(|e| SimError::io(path, e))?;
    f.write_all(bytes).map_err(|e| SimError::io(path, e))?;
    Ok(())
}

pub fn save_snapshot(paths: &SnapshotPaths, vectors: &VectorMap) -> Result<()> {
    let bytes = bincode::serialize(vectors)?;
    write_bytes(&paths.vectors(), &bytes)
}

/// Load the vector snapshot. An empty file counts as corrupt, as does a
/// document count that disagrees with `meta.json` when that file exists.
pub fn load_snapshot(paths: &SnapshotPaths) -> Result<VectorMap> {
    let buf = read_bytes(&paths.vectors())?;
    if buf.is_empty() {
        return Err(SimError::Corrupt(format!("{} is empty", paths.vectors().display())));
    }
    let vectors: VectorMap = bincode::deserialize(&buf)?;
    if paths.meta().exists() {
        let meta = load_meta(paths)?;
        if meta.num_docs as usize != vectors.len() {
            return Err(SimError::Corrupt(format!(
                "meta lists {} documents but snapshot holds {}",
                meta.num_docs,
                vectors.len()
            )));
        }
    }
    Ok(vectors)
}

/// Write ids one per line.
pub fn save_ids(paths: &SnapshotPaths, ids: &[String]) -> Result<()> {
    let path = paths.ids();
    if let Some(dir) = path.parent() {
        create_dir_all(dir).map_err(|e| SimError::io(dir, e))?;
    }
    let f = File::create(&path).map_err(|e| SimError::io(&path, e))?;
    let mut w = BufWriter::new(f);
    for id in ids {
        writeln!(w, "{id}").map_err(|e| SimError::io(&path, e))?;
    }
    w.flush().map_err(|e| SimError::io(&path, e))?;
    Ok(())
}

/// Read ids one per line, skipping blanks and `#` comments. A missing file is
/// an empty list.
pub fn load_ids(paths: &SnapshotPaths) -> Result<Vec<String>> {
    load_id_file(&paths.ids())
}

pub fn load_id_file(path: &Path) -> Result<Vec<String>> {
    let f = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SimError::io(path, e)),
    };
    let mut ids = Vec::new();
    for line in BufReader::new(f).lines() {
        let line = line.map_err(|e| SimError::io(path, e))?;
        let s = line.trim();
        if s.is_empty() || s.starts_with('#') { continue; }
        ids.push(s.to_string());
    }
    Ok(ids)
}

pub fn append_id(paths: &SnapshotPaths, id: &str) -> Result<()> {
    let path = paths.ids();
    if let Some(dir) = path.parent() {
        create_dir_all(dir).map_err(|e| SimError::io(dir, e))?;
    }
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| SimError::io(&path, e))?;
    writeln!(f, "{id}").map_err(|e| SimError::io(&path, e))?;
    Ok(())
}

pub fn save_meta(paths: &SnapshotPaths, meta: &MetaFile) -> Result<()> {
    let json = serde_json::to_string_pretty(meta)?;
    write_bytes(&paths.meta(), json.as_bytes())
}

/// Write the vector snapshot together with a fresh `meta.json`.
pub fn save_snapshot_with_meta(paths: &SnapshotPaths, vectors: &VectorMap) -> Result<()> {
    save_snapshot(paths, vectors)?;
    save_meta(paths, &MetaFile::now(vectors.len()))
}

pub fn load_meta(paths: &SnapshotPaths) -> Result<MetaFile> {
    let buf = read_bytes(&paths.meta())?;
    let meta: MetaFile = serde_json::from_slice(&buf)?;
    Ok(meta)
}
