use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ferry_ops::{
    CancelToken, EngineConfig, FileInfo, FileRef, Handoff, JobError, JobObserver, JobOutcome,
    JobProgress, JobRunner, OverwriteResponse, ProtectedPaths, SkipResponse,
};
use tempfile::TempDir;

/// Records every callback and answers prompts from scripted queues.
///
/// An unscripted prompt is answered with `Cancel`.
#[derive(Default)]
struct Recorder {
    overwrite: VecDeque<OverwriteResponse>,
    skip: VecDeque<SkipResponse>,
    claim_listing: bool,
    /// Runs before a skip prompt is answered.
    before_skip: Option<Box<dyn FnMut() + Send>>,
    /// Cancelled as soon as any bytes were reported.
    cancel_on_bytes: Option<CancelToken>,
    prompts: Vec<String>,
    infos: Vec<String>,
    progress: Vec<JobProgress>,
    new_files: Vec<FileRef>,
    listing: Vec<FileInfo>,
    renamed: Vec<(FileRef, FileRef)>,
    finished: usize,
}

impl Recorder {
    fn overwrite(answers: &[OverwriteResponse]) -> Self {
        Self {
            overwrite: answers.iter().copied().collect(),
            ..Self::default()
        }
    }

    fn skip(answers: &[SkipResponse]) -> Self {
        Self {
            skip: answers.iter().copied().collect(),
            ..Self::default()
        }
    }

    fn assert_progress_consistent(&self) {
        let mut last = 0;
        for progress in &self.progress {
            assert!(progress.processed >= last, "processed went backwards");
            assert!(progress.processed <= progress.total || progress.total == 0);
            if progress.bytes_total > 0 {
                assert!(progress.bytes_done <= progress.bytes_total);
            }
            last = progress.processed;
        }
    }

    fn current_files(&self) -> Vec<FileRef> {
        let mut files: Vec<FileRef> = Vec::new();
        for progress in &self.progress {
            if let Some(current) = &progress.current {
                if files.last() != Some(current) {
                    files.push(current.clone());
                }
            }
        }
        files
    }
}

impl JobObserver for Recorder {
    fn on_progress(&mut self, progress: &JobProgress) {
        if progress.bytes_done > 0 {
            if let Some(token) = &self.cancel_on_bytes {
                token.cancel();
            }
        }
        self.progress.push(progress.clone());
    }

    fn on_ask_overwrite(&mut self, message: &str) -> OverwriteResponse {
        self.prompts.push(message.to_string());
        self.overwrite.pop_front().unwrap_or(OverwriteResponse::Cancel)
    }

    fn on_ask_skip(&mut self, message: &str) -> SkipResponse {
        self.prompts.push(message.to_string());
        if let Some(hook) = &mut self.before_skip {
            hook();
        }
        self.skip.pop_front().unwrap_or(SkipResponse::Cancel)
    }

    fn on_info_message(&mut self, text: &str) {
        self.infos.push(text.to_string());
    }

    fn on_new_files(&mut self, files: Vec<FileRef>) {
        self.new_files.extend(files);
    }

    fn on_files_ready(&mut self, files: Vec<FileInfo>) -> Handoff<Vec<FileInfo>> {
        if self.claim_listing {
            self.listing = files;
            Handoff::Claimed
        } else {
            Handoff::Unclaimed(files)
        }
    }

    fn on_renamed(&mut self, from: &FileRef, to: &FileRef) {
        self.renamed.push((from.clone(), to.clone()));
    }

    fn on_finished(&mut self, _outcome: &JobOutcome) {
        self.finished += 1;
    }
}

fn local(path: impl AsRef<Path>) -> FileRef {
    FileRef::local(path.as_ref())
}

/// Build `root/A/b` and `root/A/c/d`.
fn create_tree(root: &Path) -> std::path::PathBuf {
    let a = root.join("A");
    fs::create_dir_all(a.join("c")).unwrap();
    fs::write(a.join("b"), "bee").unwrap();
    fs::write(a.join("c").join("d"), "dee").unwrap();
    a
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mkdir_reports_new_directory() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("docs");

    let runner = JobRunner::default();
    let mut recorder = Recorder::default();
    let outcome = runner
        .launch_mkdir(vec![local(&dir)])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success(), "{outcome}");
    assert!(dir.is_dir());
    assert_eq!(recorder.new_files, vec![local(&dir)]);
    assert_eq!(recorder.finished, 1);
    assert!(recorder.prompts.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mkdir_retry_after_fixing_the_cause() {
    let temp = TempDir::new().unwrap();
    let parent = temp.path().join("missing");
    let dir = parent.join("dir");

    let runner = JobRunner::default();
    let mut recorder = Recorder::skip(&[SkipResponse::Retry]);
    let fix = parent.clone();
    recorder.before_skip = Some(Box::new(move || fs::create_dir(&fix).unwrap()));
    let outcome = runner
        .launch_mkdir(vec![local(&dir)])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success(), "{outcome}");
    assert_eq!(recorder.prompts.len(), 1);
    assert!(recorder.prompts[0].starts_with("Failed to create directory \"dir\""));
    assert!(dir.is_dir());
    assert_eq!(recorder.new_files, vec![local(&dir)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_create_existing_file_declined() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("notes.txt");
    fs::write(&file, "keep me").unwrap();

    let runner = JobRunner::default();
    let mut recorder = Recorder::overwrite(&[OverwriteResponse::No]);
    let outcome = runner
        .launch_create(vec![local(&file)])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success());
    assert_eq!(recorder.prompts, vec!["The file \"notes.txt\" already exists"]);
    assert_eq!(fs::read_to_string(&file).unwrap(), "keep me");
    assert!(recorder.new_files.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_create_existing_file_overwritten() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("notes.txt");
    fs::write(&file, "old").unwrap();

    let runner = JobRunner::default();
    let mut recorder = Recorder::overwrite(&[OverwriteResponse::Yes]);
    let outcome = runner
        .launch_create(vec![local(&file)])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success());
    assert_eq!(fs::read_to_string(&file).unwrap(), "");
    assert_eq!(recorder.new_files, vec![local(&file)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unlink_removes_children_before_parents() {
    let temp = TempDir::new().unwrap();
    let a = create_tree(temp.path());

    let runner = JobRunner::default();
    let mut recorder = Recorder::default();
    let outcome = runner
        .launch_unlink(vec![local(&a)])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success(), "{outcome}");
    assert!(!a.exists());
    assert!(recorder.prompts.is_empty());
    assert_eq!(recorder.infos, vec!["Preparing..."]);
    recorder.assert_progress_consistent();

    let order = recorder.current_files();
    assert_eq!(order.len(), 4);
    assert_eq!(order.last(), Some(&local(&a)));
    for (i, file) in order.iter().enumerate() {
        let parent = file.parent().unwrap();
        if let Some(j) = order.iter().position(|f| *f == parent) {
            assert!(i < j, "{file} deleted after its parent");
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unlink_never_deletes_filesystem_root() {
    let runner = JobRunner::default();
    let mut recorder = Recorder::default();
    let outcome = runner
        .launch_unlink(vec![local("/")])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success());
    assert!(recorder.prompts.is_empty());
    assert!(Path::new("/").is_dir());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unlink_skips_protected_file() {
    let temp = TempDir::new().unwrap();
    let a = create_tree(temp.path());
    let protected: ProtectedPaths = [local(a.join("b"))].into_iter().collect();

    let runner = JobRunner::default().with_policy(Arc::new(protected));
    let mut recorder = Recorder::skip(&[SkipResponse::Skip, SkipResponse::Skip]);
    let outcome = runner
        .launch_unlink(vec![local(&a)])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success());
    assert_eq!(recorder.prompts.len(), 2);
    assert_eq!(
        recorder.prompts[0],
        "Could not delete file \"b\": the file is protected"
    );
    assert!(recorder.prompts[1].starts_with("Could not delete file \"A\""));
    assert!(a.join("b").exists());
    assert!(!a.join("c").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_link_remote_source_is_unsupported() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("link");

    let runner = JobRunner::default();
    let mut recorder = Recorder::default();
    let outcome = runner
        .launch_link(vec![FileRef::parse("sftp://host/file")], vec![local(&target)])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(matches!(outcome, JobOutcome::Failed(JobError::Unsupported { .. })));
    assert!(recorder.prompts.is_empty());
    assert!(recorder.new_files.is_empty());
    assert!(fs::symlink_metadata(&target).is_err());
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_link_overwrites_existing_target() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let target = temp.path().join("target");
    fs::write(&source, "data").unwrap();
    fs::write(&target, "in the way").unwrap();

    let runner = JobRunner::default();
    let mut recorder = Recorder::overwrite(&[OverwriteResponse::Yes]);
    let outcome = runner
        .launch_link(vec![local(&source)], vec![local(&target)])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success());
    assert_eq!(fs::read_link(&target).unwrap(), source);
    assert_eq!(recorder.new_files, vec![local(&source)]);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_chmod_changes_file_mode() {
    use ferry_ops::PermissionSpec;
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let file = temp.path().join("script.sh");
    fs::write(&file, "#!/bin/sh").unwrap();
    fs::set_permissions(&file, fs::Permissions::from_mode(0o755)).unwrap();

    let runner = JobRunner::default();
    let mut recorder = Recorder::default();
    let outcome = runner
        .launch_chmod(vec![local(&file)], PermissionSpec::new(0, 0, 0o777, 0o644), false)
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success());
    let mode = fs::metadata(&file).unwrap().permissions().mode();
    assert_eq!(mode & 0o7777, 0o644);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_chmod_recursive_uses_directory_and_file_modes() {
    use ferry_ops::PermissionSpec;
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let a = create_tree(temp.path());

    let runner = JobRunner::default();
    let mut recorder = Recorder::default();
    let outcome = runner
        .launch_chmod(
            vec![local(&a)],
            PermissionSpec::new(0o777, 0o750, 0o777, 0o640),
            true,
        )
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success(), "{outcome}");
    let mode = |path: &Path| fs::metadata(path).unwrap().permissions().mode() & 0o7777;
    assert_eq!(mode(&a), 0o750);
    assert_eq!(mode(&a.join("c")), 0o750);
    assert_eq!(mode(&a.join("b")), 0o640);
    assert_eq!(mode(&a.join("c").join("d")), 0o640);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_chown_recursive_to_current_owner() {
    use ferry_ops::Ownership;
    use std::os::unix::fs::MetadataExt;

    let temp = TempDir::new().unwrap();
    let a = create_tree(temp.path());
    let uid = fs::metadata(&a).unwrap().uid();

    let runner = JobRunner::default();
    let mut recorder = Recorder::default();
    let outcome = runner
        .launch_chown(vec![local(&a)], Ownership::User(uid), true)
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success(), "{outcome}");
    assert_eq!(recorder.current_files().len(), 4);
    recorder.assert_progress_consistent();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_copy_tree() {
    let temp = TempDir::new().unwrap();
    let a = create_tree(temp.path());
    let target = temp.path().join("copy");

    let runner = JobRunner::default();
    let mut recorder = Recorder::default();
    let outcome = runner
        .launch_copy(vec![local(&a)], vec![local(&target)])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success(), "{outcome}");
    assert_eq!(fs::read_to_string(target.join("b")).unwrap(), "bee");
    assert_eq!(fs::read_to_string(target.join("c").join("d")).unwrap(), "dee");
    assert!(a.join("b").exists());
    assert_eq!(recorder.new_files, vec![local(&target)]);

    recorder.assert_progress_consistent();
    let last = recorder.progress.last().unwrap();
    assert_eq!(last.bytes_total, 6);
    assert_eq!(last.bytes_done, 6);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_copy_preserves_modification_time() {
    use filetime::FileTime;

    let temp = TempDir::new().unwrap();
    let source = temp.path().join("old.txt");
    let target = temp.path().join("new.txt");
    fs::write(&source, "content").unwrap();
    let mtime = FileTime::from_unix_time(1_000_000_000, 0);
    filetime::set_file_mtime(&source, mtime).unwrap();

    let config = EngineConfig::builder().verify_copies(true).build().unwrap();
    let runner = JobRunner::new(config);
    let mut recorder = Recorder::default();
    let outcome = runner
        .launch_copy(vec![local(&source)], vec![local(&target)])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success());
    let copied = fs::metadata(&target).unwrap();
    assert_eq!(FileTime::from_last_modification_time(&copied), mtime);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_copy_merges_directories_and_asks_per_file() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("src").join("A");
    let target = temp.path().join("dst").join("A");
    fs::create_dir_all(&source).unwrap();
    fs::create_dir_all(&target).unwrap();
    fs::write(source.join("x"), "new").unwrap();
    fs::write(source.join("y"), "y").unwrap();
    fs::write(target.join("x"), "old").unwrap();
    fs::write(target.join("z"), "untouched").unwrap();

    let runner = JobRunner::default();
    let mut recorder = Recorder::overwrite(&[OverwriteResponse::Yes]);
    let outcome = runner
        .launch_copy(vec![local(&source)], vec![local(&target)])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success(), "{outcome}");
    assert_eq!(recorder.prompts, vec!["The file \"x\" already exists"]);
    assert_eq!(fs::read_to_string(target.join("x")).unwrap(), "new");
    assert_eq!(fs::read_to_string(target.join("y")).unwrap(), "y");
    assert_eq!(fs::read_to_string(target.join("z")).unwrap(), "untouched");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_move_renames_in_place() {
    let temp = TempDir::new().unwrap();
    let a = create_tree(temp.path());
    let target = temp.path().join("moved");

    let runner = JobRunner::default();
    let mut recorder = Recorder::default();
    let outcome = runner
        .launch_move(vec![local(&a)], vec![local(&target)])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success());
    assert!(!a.exists());
    assert_eq!(fs::read_to_string(target.join("c").join("d")).unwrap(), "dee");
    assert_eq!(recorder.new_files, vec![local(&target)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_move_into_existing_directory_removes_sources() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("src").join("A");
    let target = temp.path().join("dst").join("A");
    fs::create_dir_all(source.join("inner")).unwrap();
    fs::write(source.join("inner").join("f"), "f").unwrap();
    fs::create_dir_all(&target).unwrap();

    let runner = JobRunner::default();
    let mut recorder = Recorder::default();
    let outcome = runner
        .launch_move(vec![local(&source)], vec![local(&target)])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success(), "{outcome}");
    assert!(!source.exists());
    assert_eq!(fs::read_to_string(target.join("inner").join("f")).unwrap(), "f");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_move_keeps_sources_that_were_not_transferred() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("src").join("A");
    let target = temp.path().join("dst").join("A");
    fs::create_dir_all(&source).unwrap();
    fs::create_dir_all(&target).unwrap();
    fs::write(source.join("x"), "mine").unwrap();
    fs::write(source.join("y"), "y").unwrap();
    fs::write(target.join("x"), "theirs").unwrap();

    let runner = JobRunner::default();
    let mut recorder = Recorder::overwrite(&[OverwriteResponse::No]);
    let outcome = runner
        .launch_move(vec![local(&source)], vec![local(&target)])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success(), "{outcome}");
    assert_eq!(fs::read_to_string(source.join("x")).unwrap(), "mine");
    assert_eq!(fs::read_to_string(target.join("x")).unwrap(), "theirs");
    assert!(!source.join("y").exists());
    assert_eq!(fs::read_to_string(target.join("y")).unwrap(), "y");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_move_into_itself_can_be_skipped() {
    let temp = TempDir::new().unwrap();
    let a = create_tree(temp.path());
    let inside = a.join("c").join("A");

    let runner = JobRunner::default();
    let mut recorder = Recorder::skip(&[SkipResponse::Skip]);
    let outcome = runner
        .launch_move(vec![local(&a)], vec![local(&inside)])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success());
    assert_eq!(recorder.prompts, vec!["Cannot move \"A\" into itself"]);
    assert!(a.join("b").exists());
    assert!(!inside.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_answer_cancels_job() {
    let temp = TempDir::new().unwrap();
    let a = create_tree(temp.path());

    let runner = JobRunner::default();
    let mut recorder = Recorder::skip(&[SkipResponse::Cancel]);
    let outcome = runner
        .launch_copy(vec![local(&a)], vec![local(a.join("copy"))])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(matches!(outcome, JobOutcome::Cancelled));
    assert_eq!(recorder.finished, 1);
    assert!(recorder.new_files.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_restore_recreates_parent_directories() {
    let temp = TempDir::new().unwrap();
    let trashed = temp.path().join("trash").join("report.txt");
    let original = temp.path().join("home").join("docs").join("report.txt");
    fs::create_dir_all(trashed.parent().unwrap()).unwrap();
    fs::write(&trashed, "quarterly").unwrap();

    let runner = JobRunner::default();
    let mut recorder = Recorder::default();
    let outcome = runner
        .launch_restore(vec![local(&trashed)], vec![local(&original)])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success(), "{outcome}");
    assert!(!trashed.exists());
    assert_eq!(fs::read_to_string(&original).unwrap(), "quarterly");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rename_reports_new_name() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("draft.txt");
    fs::write(&file, "text").unwrap();

    let runner = JobRunner::default();
    let mut recorder = Recorder::default();
    let outcome = runner
        .launch_rename(local(&file), "final.txt")
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success());
    let renamed = temp.path().join("final.txt");
    assert_eq!(recorder.renamed, vec![(local(&file), local(&renamed))]);
    assert!(renamed.exists());
    assert!(!file.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rename_accepts_trailing_dot() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("notes");
    fs::write(&file, "text").unwrap();

    let runner = JobRunner::default();
    let mut recorder = Recorder::default();
    let outcome = runner
        .launch_rename(local(&file), "notes.")
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success(), "{outcome}");
    assert!(temp.path().join("notes.").exists());
    assert!(!file.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rename_never_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("a");
    let other = temp.path().join("b");
    fs::write(&file, "a").unwrap();
    fs::write(&other, "b").unwrap();

    let runner = JobRunner::default();
    let mut recorder = Recorder::default();
    let outcome = runner
        .launch_rename(local(&file), "b")
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(matches!(outcome, JobOutcome::Failed(JobError::AlreadyExists { .. })));
    assert_eq!(fs::read_to_string(&other).unwrap(), "b");
    assert!(recorder.renamed.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_hands_over_sorted_entries() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("b"), "").unwrap();
    fs::write(temp.path().join("a"), "").unwrap();
    fs::create_dir(temp.path().join("c")).unwrap();
    fs::write(temp.path().join("c").join("nested"), "").unwrap();

    let runner = JobRunner::default();
    let mut recorder = Recorder {
        claim_listing: true,
        ..Recorder::default()
    };
    let outcome = runner
        .launch_list(local(temp.path()))
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(outcome.is_success());
    let names: Vec<&str> = recorder.listing.iter().map(|info| info.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(recorder.listing[2].is_dir());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_of_regular_file_fails() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("plain.txt");
    fs::write(&file, "text").unwrap();

    let runner = JobRunner::default();
    let mut recorder = Recorder {
        claim_listing: true,
        ..Recorder::default()
    };
    let outcome = runner
        .launch_list(local(&file))
        .unwrap()
        .run(&mut recorder)
        .await;

    match outcome {
        JobOutcome::Failed(JobError::Io { source, .. }) => {
            assert_eq!(source.kind(), std::io::ErrorKind::NotADirectory);
        }
        other => panic!("expected a NotADirectory failure, got {other}"),
    }
    assert!(recorder.listing.is_empty());
    assert_eq!(recorder.finished, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_trash_refuses_protected_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("precious");
    fs::write(&file, "").unwrap();
    let protected: ProtectedPaths = [local(&file)].into_iter().collect();

    let runner = JobRunner::default().with_policy(Arc::new(protected));
    let mut recorder = Recorder::default();
    let outcome = runner
        .launch_trash(vec![local(&file)])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(matches!(outcome, JobOutcome::Failed(JobError::Protected { .. })));
    assert!(file.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_between_chunks_removes_partial_copy() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("large.bin");
    let target = temp.path().join("large.copy");
    fs::write(&source, vec![7u8; 4 * 1024 * 1024]).unwrap();

    let config = EngineConfig::builder()
        .copy_chunk_size(1024usize)
        .channel_capacity(1usize)
        .build()
        .unwrap();
    let runner = JobRunner::new(config);
    let handle = runner
        .launch_copy(vec![local(&source)], vec![local(&target)])
        .unwrap();
    let mut recorder = Recorder {
        cancel_on_bytes: Some(handle.canceller()),
        ..Recorder::default()
    };
    let outcome = handle.run(&mut recorder).await;

    assert!(matches!(outcome, JobOutcome::Cancelled), "{outcome}");
    assert!(recorder.progress.iter().any(|p| p.bytes_done > 0));
    assert!(!target.exists());
    assert!(source.exists());
    assert!(recorder.prompts.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_through_handle_stops_running_job() {
    let temp = TempDir::new().unwrap();
    let a = create_tree(temp.path());

    let config = EngineConfig::builder()
        .channel_capacity(1usize)
        .build()
        .unwrap();
    let runner = JobRunner::new(config);
    let handle = runner.launch_unlink(vec![local(&a)]).unwrap();

    // The worker blocks on its first message until the handle is run
    handle.cancel();
    let mut recorder = Recorder::default();
    let outcome = handle.run(&mut recorder).await;

    assert!(matches!(outcome, JobOutcome::Cancelled), "{outcome}");
    assert_eq!(recorder.finished, 1);
    assert!(a.join("b").exists());
    assert!(a.join("c").join("d").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_expired_deadline_cancels_job() {
    let temp = TempDir::new().unwrap();
    let a = create_tree(temp.path());

    let config = EngineConfig::builder()
        .job_deadline(Some(Duration::ZERO))
        .build()
        .unwrap();
    let runner = JobRunner::new(config);
    let mut recorder = Recorder::default();
    let outcome = runner
        .launch_unlink(vec![local(&a)])
        .unwrap()
        .run(&mut recorder)
        .await;

    assert!(matches!(outcome, JobOutcome::Cancelled));
    assert!(a.join("c").join("d").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_launch_rejects_invalid_operations() {
    let runner = JobRunner::default();
    let file = local("/tmp/ferry-test-file");

    let err = runner
        .launch_copy(vec![file.clone()], Vec::new())
        .err()
        .unwrap();
    assert!(matches!(err, JobError::MismatchedLists { sources: 1, targets: 0 }));

    let err = runner.launch_move(Vec::new(), Vec::new()).err().unwrap();
    assert!(matches!(err, JobError::EmptyFileList));

    let err = runner.launch_trash(Vec::new()).err().unwrap();
    assert!(matches!(err, JobError::EmptyFileList));

    let err = runner.launch_rename(file, "a/b").err().unwrap();
    assert!(matches!(err, JobError::InvalidDisplayName { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_job_ids_are_unique() {
    let temp = TempDir::new().unwrap();
    let runner = JobRunner::default();

    let first = runner.launch_mkdir(vec![local(temp.path().join("1"))]).unwrap();
    let second = runner.launch_mkdir(vec![local(temp.path().join("2"))]).unwrap();
    assert_ne!(first.id(), second.id());

    let mut recorder = Recorder::default();
    assert!(first.run(&mut recorder).await.is_success());
    assert!(second.run(&mut recorder).await.is_success());
    assert_eq!(recorder.finished, 2);
}
