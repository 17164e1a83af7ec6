// JSON schedule snapshots for static front ends.
//
// Two files with the same records: a minified one for the page to load and
// a 4-space indented one for humans and diffs. Each is written to a temp
// file in the target directory and renamed into place.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;
use tracing::info;

use contestboard_common::{Contest, SnapshotRecord};

pub const MINIFIED_FILE: &str = "contests-schedule-minified.json";
pub const PRETTY_FILE: &str = "contests-schedule.json";

/// One record per contest, in the given order. Ids are freshly generated
/// on every call.
pub fn snapshot_records(contests: &[Contest]) -> Vec<SnapshotRecord> {
    contests.iter().map(SnapshotRecord::from).collect()
}

/// Paths of the files written by [`write_snapshots`].
#[derive(Debug, Clone)]
pub struct SnapshotPaths {
    pub minified: PathBuf,
    pub pretty: PathBuf,
}

/// Write both snapshot files into `dir`. An empty contest list still
/// produces two valid files holding `[]`.
pub fn write_snapshots(dir: &Path, contests: &[Contest]) -> Result<SnapshotPaths> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output dir {}", dir.display()))?;

    let records = snapshot_records(contests);
    let minified = serde_json::to_vec(&records).context("Failed to serialize snapshot")?;
    let pretty = to_pretty(&records)?;

    let paths = SnapshotPaths {
        minified: dir.join(MINIFIED_FILE),
        pretty: dir.join(PRETTY_FILE),
    };
    write_atomically(&paths.minified, &minified)?;
    write_atomically(&paths.pretty, &pretty)?;

    info!(
        records = records.len(),
        dir = %dir.display(),
        "Wrote schedule snapshots"
    );
    Ok(paths)
}

fn to_pretty<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value
        .serialize(&mut ser)
        .context("Failed to serialize snapshot")?;
    Ok(out)
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to move snapshot into {}", path.display()))?;
    Ok(())
}
