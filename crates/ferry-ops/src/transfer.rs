//! Move, copy and restore.
//!
//! Each source/target pair goes through the same stages: resolve the pair
//! (protection and "into itself" checks, the rename fast path for moves),
//! plan the source tree, then for every entry check the destination, create
//! it, stream data for regular files, verify and preserve metadata. Moves
//! finally remove the sources whose whole subtree was written.

use std::collections::HashSet;
use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use filetime::FileTime;
use tracing::{debug, warn};

use ferry_core::{EntryKind, FileList, FileRef, JobError};
use ferry_scan::Scanner;

use crate::create::remove_existing;
use crate::job::{JobContext, require_local};
use crate::link::symlink;
use crate::prompt::{Decision, OverwriteResponse};

/// How sources are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransferMode {
    Copy,
    Move,
    /// A move back out of the trash, recreating missing parent directories.
    Restore,
}

impl TransferMode {
    fn removes_source(self) -> bool {
        !matches!(self, Self::Copy)
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Move => "move",
            Self::Restore => "restore",
        }
    }
}

/// One entry of a planned source tree.
struct PlanEntry {
    source: PathBuf,
    target: PathBuf,
    kind: EntryKind,
    metadata: Metadata,
}

/// A pair that needs a full copy.
struct PlannedPair {
    target: FileRef,
    /// Source tree in pre-order: every directory before its contents.
    entries: Vec<PlanEntry>,
}

enum Resolution {
    Moved,
    Planned(PlannedPair),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryResult {
    Created,
    Merged,
    Skipped,
}

/// Transfer every `sources[i]` to `targets[i]`.
pub(crate) fn transfer(
    ctx: &mut JobContext,
    sources: FileList,
    targets: FileList,
    mode: TransferMode,
) -> Result<(), JobError> {
    let mut new_files = FileList::new();
    let mut planned = Vec::new();

    for (source, target) in sources.into_iter().zip(targets) {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let resolution = retry_or_skip(ctx, |ctx| resolve_pair(ctx, &source, &target, mode))?;
        match resolution {
            Some(Resolution::Moved) => new_files.push(target),
            Some(Resolution::Planned(pair)) => planned.push(pair),
            None => debug!(%source, "Skipped"),
        }
    }

    let entries: usize = planned.iter().map(|pair| pair.entries.len()).sum();
    let bytes: u64 = planned
        .iter()
        .flat_map(|pair| &pair.entries)
        .filter(|entry| entry.kind == EntryKind::File)
        .map(|entry| entry.metadata.len())
        .sum();
    ctx.set_total(entries)?;
    ctx.set_total_bytes(bytes);

    for pair in planned {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        if copy_pair(ctx, &pair, mode)? {
            new_files.push(pair.target);
        }
    }

    if ctx.is_cancelled() {
        return Err(JobError::Cancelled);
    }

    ctx.emit_new_files(new_files);
    Ok(())
}

/// Check a pair and either move it in one step or plan a full copy.
fn resolve_pair(
    ctx: &mut JobContext,
    source: &FileRef,
    target: &FileRef,
    mode: TransferMode,
) -> Result<Resolution, String> {
    let verb = mode.verb();
    let name = source.display_name();
    let source_path = require_local(source, verb).map_err(|e| e.to_string())?;
    let target_path = require_local(target, verb).map_err(|e| e.to_string())?;

    if mode.removes_source() && ctx.policy().is_protected(source) {
        return Err(format!("Could not {verb} \"{name}\": the file is protected"));
    }

    if target_path.starts_with(source_path) {
        return Err(format!("Cannot {verb} \"{name}\" into itself"));
    }

    if mode == TransferMode::Restore {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("Failed to {verb} \"{name}\": {e}"))?;
        }
    }

    if mode.removes_source() && fs::symlink_metadata(target_path).is_err() {
        match fs::rename(source_path, target_path) {
            Ok(()) => {
                debug!(source = %source_path.display(), target = %target_path.display(), "Renamed in place");
                return Ok(Resolution::Moved);
            }
            // Typically a cross-device move; fall back to copy and delete
            Err(err) => debug!(error = %err, "Rename failed, copying instead"),
        }
    }

    plan(ctx, source, source_path, target_path)
        .map(|entries| {
            Resolution::Planned(PlannedPair {
                target: target.clone(),
                entries,
            })
        })
        .map_err(|e| format!("Failed to {verb} \"{name}\": {e}"))
}

/// Collect the source tree in pre-order with target paths and metadata.
fn plan(
    ctx: &JobContext,
    source: &FileRef,
    source_path: &Path,
    target_path: &Path,
) -> Result<Vec<PlanEntry>, JobError> {
    let mut files = Scanner::collect(std::slice::from_ref(source), ctx.token())?;
    files.reverse();

    files
        .into_iter()
        .map(|file| {
            let path = require_local(&file, "copy")?.to_path_buf();
            let metadata = fs::symlink_metadata(&path).map_err(|e| JobError::io(file.clone(), e))?;
            let target = match path.strip_prefix(source_path) {
                Ok(relative) if !relative.as_os_str().is_empty() => target_path.join(relative),
                _ => target_path.to_path_buf(),
            };
            Ok(PlanEntry {
                kind: EntryKind::from_metadata(&metadata),
                source: path,
                target,
                metadata,
            })
        })
        .collect()
}

/// Copy one planned pair. Returns true if its root was written.
fn copy_pair(ctx: &mut JobContext, pair: &PlannedPair, mode: TransferMode) -> Result<bool, JobError> {
    let mut written: HashSet<&Path> = HashSet::new();
    let mut incomplete: HashSet<&Path> = HashSet::new();
    let mut created_dirs: Vec<&PlanEntry> = Vec::new();
    let mut skipped_dir: Option<&Path> = None;

    let root = match pair.entries.first() {
        Some(entry) => entry.source.as_path(),
        None => return Ok(false),
    };

    for entry in &pair.entries {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        // Everything below a skipped directory is skipped too
        if let Some(dir) = skipped_dir {
            if entry.source.starts_with(dir) {
                continue;
            }
            skipped_dir = None;
        }

        ctx.advance(&FileRef::from(entry.source.as_path()));

        match copy_entry(ctx, entry, mode)? {
            EntryResult::Created => {
                written.insert(entry.source.as_path());
                if entry.kind.is_dir() {
                    created_dirs.push(entry);
                } else {
                    preserve(ctx, entry);
                }
            }
            EntryResult::Merged => {
                written.insert(entry.source.as_path());
            }
            EntryResult::Skipped => {
                mark_incomplete(&mut incomplete, &entry.source, root);
                if entry.kind.is_dir() {
                    skipped_dir = Some(entry.source.as_path());
                }
            }
        }
    }

    // Directory times change while their contents are written
    for entry in created_dirs.iter().rev() {
        preserve(ctx, entry);
    }

    if mode.removes_source() {
        remove_sources(ctx, pair, &written, &mut incomplete, root)?;
    }

    Ok(written.contains(root))
}

/// Check the destination of one entry, then create it.
fn copy_entry(ctx: &mut JobContext, entry: &PlanEntry, mode: TransferMode) -> Result<EntryResult, JobError> {
    let name = FileRef::from(entry.source.as_path()).display_name();
    let verb = mode.verb();

    if let Ok(existing) = fs::symlink_metadata(&entry.target) {
        if existing.is_dir() && entry.kind.is_dir() {
            debug!(target = %entry.target.display(), "Merging into existing directory");
            return Ok(EntryResult::Merged);
        }

        let target_name = FileRef::from(entry.target.as_path()).display_name();
        match ctx.ask_overwrite(format!("The file \"{target_name}\" already exists")) {
            OverwriteResponse::Yes => {
                let removed = retry_or_skip(ctx, |_| {
                    remove_destination(&entry.target, &existing)
                        .map_err(|e| format!("Failed to {verb} \"{name}\": {e}"))
                })?;
                if removed.is_none() {
                    return Ok(EntryResult::Skipped);
                }
            }
            OverwriteResponse::No => return Ok(EntryResult::Skipped),
            OverwriteResponse::Cancel => return Err(JobError::Cancelled),
        }
    }

    let created = retry_or_skip(ctx, |ctx| {
        write_entry(ctx, entry).map_err(|e| format!("Failed to {verb} \"{name}\": {e}"))
    })?;

    Ok(match created {
        Some(()) => EntryResult::Created,
        None => EntryResult::Skipped,
    })
}

fn remove_destination(target: &Path, existing: &Metadata) -> io::Result<()> {
    if existing.is_dir() {
        fs::remove_dir_all(target)
    } else {
        fs::remove_file(target)
    }
}

/// Create the destination of one entry.
fn write_entry(ctx: &mut JobContext, entry: &PlanEntry) -> io::Result<()> {
    match entry.kind {
        EntryKind::Directory => fs::create_dir(&entry.target),
        EntryKind::Symlink => {
            let link_target = fs::read_link(&entry.source)?;
            symlink(&link_target, &entry.target)
        }
        EntryKind::File => {
            copy_file(ctx, &entry.source, &entry.target)?;
            if ctx.config().verify_copies {
                verify(&entry.source, &entry.target).inspect_err(|_| {
                    let _ = fs::remove_file(&entry.target);
                })?;
            }
            Ok(())
        }
        EntryKind::Other => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "special files cannot be copied",
        )),
    }
}

/// Stream `source` into a new file at `target`.
///
/// Cancellation is checked between chunks. A partially written target is
/// removed again.
fn copy_file(ctx: &mut JobContext, source: &Path, target: &Path) -> io::Result<u64> {
    let mut reader = File::open(source)?;
    let mut writer = OpenOptions::new().write(true).create_new(true).open(target)?;

    let result = stream(ctx, &mut reader, &mut writer).and_then(|bytes| {
        writer.sync_all()?;
        Ok(bytes)
    });

    if result.is_err() {
        drop(writer);
        let _ = fs::remove_file(target);
    }
    result
}

fn stream(ctx: &mut JobContext, reader: &mut File, writer: &mut File) -> io::Result<u64> {
    let mut buffer = vec![0u8; ctx.config().copy_chunk_size.max(1)];
    let mut total = 0u64;

    loop {
        if ctx.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "Operation was cancelled"));
        }

        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };

        writer.write_all(&buffer[..read])?;
        total += read as u64;
        ctx.add_bytes(read as u64);
    }

    Ok(total)
}

/// Compare both files by content hash.
fn verify(source: &Path, target: &Path) -> io::Result<()> {
    if hash_file(source)? != hash_file(target)? {
        return Err(io::Error::other("the copy does not match the original"));
    }
    Ok(())
}

fn hash_file(path: &Path) -> io::Result<blake3::Hash> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hasher.finalize())
}

/// Copy permissions and timestamps onto a written entry, best effort.
fn preserve(ctx: &JobContext, entry: &PlanEntry) {
    if !ctx.config().preserve_metadata {
        return;
    }

    let atime = FileTime::from_last_access_time(&entry.metadata);
    let mtime = FileTime::from_last_modification_time(&entry.metadata);

    let result = if entry.kind == EntryKind::Symlink {
        filetime::set_symlink_file_times(&entry.target, atime, mtime)
    } else {
        fs::set_permissions(&entry.target, entry.metadata.permissions())
            .and_then(|()| filetime::set_file_times(&entry.target, atime, mtime))
    };

    if let Err(err) = result {
        warn!(target = %entry.target.display(), error = %err, "Failed to preserve metadata");
    }
}

/// Remove moved sources, children first.
///
/// Only entries whose whole subtree was written are removed.
fn remove_sources<'a>(
    ctx: &mut JobContext,
    pair: &'a PlannedPair,
    written: &HashSet<&'a Path>,
    incomplete: &mut HashSet<&'a Path>,
    root: &'a Path,
) -> Result<(), JobError> {
    for entry in pair.entries.iter().rev() {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        if !written.contains(entry.source.as_path()) || incomplete.contains(entry.source.as_path()) {
            continue;
        }

        let file = FileRef::from(entry.source.as_path());
        let name = file.display_name();

        let removed = retry_or_skip(ctx, |ctx| {
            if ctx.policy().is_protected(&file) {
                return Err(format!("Could not remove source \"{name}\": the file is protected"));
            }
            remove_existing(&entry.source).map_err(|e| format!("Could not remove source \"{name}\": {e}"))
        })?;

        match removed {
            Some(()) => debug!(path = %entry.source.display(), "Removed source"),
            None => mark_incomplete(incomplete, &entry.source, root),
        }
    }

    Ok(())
}

/// Mark `path` and its ancestors up to `root` as not fully transferred.
fn mark_incomplete<'a>(incomplete: &mut HashSet<&'a Path>, path: &'a Path, root: &'a Path) {
    let mut current = Some(path);
    while let Some(path) = current {
        incomplete.insert(path);
        if path == root {
            break;
        }
        current = path.parent();
    }
}

/// Run `attempt` until it succeeds or the controller gives up on it.
///
/// Returns `None` if the controller chose to skip.
fn retry_or_skip<T, F>(ctx: &mut JobContext, mut attempt: F) -> Result<Option<T>, JobError>
where
    F: FnMut(&mut JobContext) -> Result<T, String>,
{
    loop {
        let message = match attempt(ctx) {
            Ok(value) => return Ok(Some(value)),
            Err(message) => message,
        };

        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        warn!(%message, "Transfer step failed");
        match Decision::from(ctx.ask_skip(message)) {
            Decision::Retry => continue,
            Decision::Next => return Ok(None),
            Decision::Abort => return Err(JobError::Cancelled),
        }
    }
}
