//! File access for a run: reading, hashing and the backup-then-overwrite commit.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Read a whole file as UTF-8 text.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// `path` with `suffix` appended to its file name (`06_pops.txt` → `06_pops.txt.backup`).
pub fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

pub fn sha256_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 1 << 16];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Write-then-rename wrapper: the target only changes once `finalize` succeeds.
struct PendingWrite {
    target: PathBuf,
    tmp: NamedTempFile,
}

impl PendingWrite {
    fn open(target: &Path) -> std::io::Result<Self> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir)?;
        Ok(Self { target: target.to_path_buf(), tmp })
    }

    fn finalize(self) -> std::io::Result<()> {
        self.tmp.as_file().sync_all().ok(); // best-effort fsync file
        self.tmp.persist(&self.target).map_err(|e| e.error)?;
        if let Some(dir) = self.target.parent().filter(|d| !d.as_os_str().is_empty()) {
            let _ = File::open(dir).and_then(|f| f.sync_all());
        }
        Ok(())
    }
}

impl Write for PendingWrite {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> { self.tmp.write(buf) }
    fn flush(&mut self) -> std::io::Result<()> { self.tmp.flush() }
}

fn write_atomically(target: &Path, contents: &str) -> std::io::Result<()> {
    let mut pending = PendingWrite::open(target)?;
    pending.write_all(contents.as_bytes())?;
    pending.flush()?;
    pending.finalize()
}

/// Paths and checksums of a completed commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitReport {
    pub path: PathBuf,
    pub backup: PathBuf,
    pub backup_sha256: String,
    pub bytes_written: usize,
    /// The new text equals the original; the file was still rewritten.
    pub unchanged: bool,
}

/// Replace `path` (whose contents were read as `original`) with `new_text`.
///
/// The file must still hash to `original`. The original is then written to the
/// backup path and verified before the target is overwritten through a temp file
/// in the same directory. Every failure before the overwrite leaves the target
/// untouched; a failed overwrite reports where the backup is.
pub fn commit(path: &Path, original: &str, new_text: &str, backup_suffix: &str) -> Result<CommitReport> {
    let expected = sha256_bytes(original.as_bytes());
    let on_disk = sha256_file(path).map_err(|e| Error::io(path, e))?;
    if on_disk != expected {
        return Err(Error::Stale { path: path.to_path_buf() });
    }

    let backup = backup_path(path, backup_suffix);
    write_atomically(&backup, original)
        .map_err(|e| Error::Backup { path: backup.clone(), reason: e.to_string() })?;
    let written = sha256_file(&backup)
        .map_err(|e| Error::Backup { path: backup.clone(), reason: e.to_string() })?;
    if written != expected {
        return Err(Error::Backup { path: backup, reason: "checksum mismatch after write".into() });
    }
    debug!(backup = %backup.display(), sha256 = %written, "backup verified");

    write_atomically(path, new_text)
        .map_err(|source| Error::Commit { path: path.to_path_buf(), backup: backup.clone(), source })?;
    info!(path = %path.display(), backup = %backup.display(), bytes = new_text.len(), "data file rewritten");

    Ok(CommitReport {
        path: path.to_path_buf(),
        backup,
        backup_sha256: written,
        bytes_written: new_text.len(),
        unchanged: new_text == original,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_path_appends_suffix() {
        assert_eq!(backup_path(Path::new("common/pops/06_pops.txt"), ".backup"), PathBuf::from("common/pops/06_pops.txt.backup"));
        assert_eq!(backup_path(Path::new("pops"), ".bak"), PathBuf::from("pops.bak"));
    }

    #[test]
    fn hashes_match_for_bytes_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "abc").unwrap();
        assert_eq!(sha256_file(&path).unwrap(), sha256_bytes(b"abc"));
        assert_eq!(sha256_bytes(b"abc"), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }

    #[test]
    fn commit_writes_backup_then_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pops.txt");
        fs::write(&path, "old\n").unwrap();

        let report = commit(&path, "old\n", "new\n", ".backup").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
        assert_eq!(fs::read_to_string(&report.backup).unwrap(), "old\n");
        assert_eq!(report.backup, dir.path().join("pops.txt.backup"));
        assert!(!report.unchanged);

        // A second run backs up the current contents, replacing the old backup.
        commit(&path, "new\n", "newer\n", ".backup").unwrap();
        assert_eq!(fs::read_to_string(&report.backup).unwrap(), "new\n");
    }

    #[test]
    fn stale_file_is_not_touched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pops.txt");
        fs::write(&path, "edited elsewhere\n").unwrap();

        let err = commit(&path, "old\n", "new\n", ".backup").unwrap_err();
        assert!(matches!(err, Error::Stale { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "edited elsewhere\n");
        assert!(!backup_path(&path, ".backup").exists());
    }

    #[test]
    fn failed_backup_leaves_target_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pops.txt");
        fs::write(&path, "old\n").unwrap();
        fs::create_dir(backup_path(&path, ".backup")).unwrap();
        fs::write(backup_path(&path, ".backup").join("occupied"), "").unwrap();

        let err = commit(&path, "old\n", "new\n", ".backup").unwrap_err();
        assert!(matches!(err, Error::Backup { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "old\n");
    }
}
