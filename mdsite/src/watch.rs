//! File system watcher for live regeneration.
//!
//! Every change to a manifest source (or to the manifest itself) triggers a full conversion pass.
//! Passes run one at a time on the watching thread, and bursts of events are coalesced
//! so a single save produces a single pass.

use crate::{manifest::Manifest, Site};
use anyhow::{Context, Result};
use foldhash::{HashSet, HashSetExt};
use log::{error, info, warn};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::{
    path::{Path, PathBuf},
    sync::mpsc::{channel, Receiver, RecvTimeoutError},
    thread::{self, JoinHandle},
    time::Duration,
};

/// Quiet period after a change before a pass starts
const DEBOUNCE: Duration = Duration::from_millis(200);

/// Converts the whole site, then again whenever a watched file changes.
/// Failed passes are logged and do not stop the watcher.
///
/// This function blocks until the watcher shuts down.
///
/// # Errors
/// This function returns an error if:
/// - the manifest cannot be read to find the files to watch
/// - the file watcher cannot be created or set up
pub fn run(site: &Site) -> Result<()> {
    let manifest = Manifest::from_path(site.manifest_path())?;
    let watched = watched_files(site.manifest_path(), &manifest);

    let (tx, rx) = channel();
    let mut watcher = notify::recommended_watcher(tx).context("failed to create file watcher")?;

    // Watching directories instead of files keeps track of files that editors replace on save
    let directories: HashSet<&Path> = watched.iter().filter_map(|path| path.parent()).collect();
    for dir in directories {
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {dir:?}"))?;
    }
    info!("watching {} files for changes", watched.len());

    convert(site);

    while let Some(changed) = next_changes(&rx, &watched) {
        for path in changed {
            info!("file {} has been changed", path.display());
        }
        convert(site);
    }

    Ok(())
}

/// Runs [`run`] on a new thread, logging the error it stops with.
///
/// # Errors
/// This function returns an error if the manifest cannot be read,
/// so a broken site is reported before anything is served.
pub fn spawn(site: Site) -> Result<JoinHandle<()>> {
    Manifest::from_path(site.manifest_path()).context("failed to start watching for changes")?;

    Ok(thread::spawn(move || {
        if let Err(e) = run(&site) {
            error!("file watcher stopped: {e:#}");
        }
    }))
}

fn convert(site: &Site) {
    match site.convert_all() {
        Ok(count) => info!("converted all {count} files"),
        Err(e) => error!("error converting: {e:#}"),
    }
}

/// Blocks until a watched file changes, then gathers changes until the debounce period passes.
/// Returns `None` once the watcher is gone.
fn next_changes(
    rx: &Receiver<notify::Result<Event>>,
    watched: &HashSet<PathBuf>,
) -> Option<Vec<PathBuf>> {
    let mut changed = Vec::new();

    while changed.is_empty() {
        absorb(rx.recv().ok()?, watched, &mut changed);
    }

    loop {
        match rx.recv_timeout(DEBOUNCE) {
            Ok(event) => absorb(event, watched, &mut changed),
            Err(RecvTimeoutError::Timeout) => return Some(changed),
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}

fn absorb(event: notify::Result<Event>, watched: &HashSet<PathBuf>, changed: &mut Vec<PathBuf>) {
    match event {
        Ok(event) if is_relevant(&event) => {
            for path in event.paths {
                if watched.contains(&path) && !changed.contains(&path) {
                    changed.push(path);
                }
            }
        }
        Ok(_) => {}
        Err(e) => warn!("file watcher error: {e}"),
    }
}

const fn is_relevant(event: &Event) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
}

/// Absolute paths of the manifest and all of its sources, as the watcher reports them.
fn watched_files(manifest_path: &Path, manifest: &Manifest) -> HashSet<PathBuf> {
    let mut watched = HashSet::with_capacity(manifest.entries.len() + 1);

    for path in manifest
        .entries
        .iter()
        .map(|entry| &*entry.source)
        .chain([manifest_path])
    {
        match resolve(path) {
            Some(path) => {
                watched.insert(path);
            }
            None => warn!("cannot watch {path:?}: its directory does not exist"),
        }
    }

    watched
}

/// Resolves a path to an absolute path without symlinks. The file itself may not exist yet.
fn resolve(path: &Path) -> Option<PathBuf> {
    path.canonicalize().ok().or_else(|| {
        let parent = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        Some(parent.canonicalize().ok()?.join(path.file_name()?))
    })
}

#[cfg(test)]
mod test {
    use super::{absorb, next_changes, resolve, spawn, watched_files};
    use crate::{manifest::Manifest, PageBuilder, Site};
    use notify::{
        event::{AccessKind, CreateKind, DataChange, ModifyKind},
        Event, EventKind,
    };
    use std::{fs::write, sync::mpsc::channel};

    #[test]
    fn resolve_paths() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let root = dir.path().canonicalize().expect("directory should exist");
        let file = dir.path().join("a.md");

        assert_eq!(
            resolve(&file),
            Some(root.join("a.md")),
            "files that do not exist yet should still resolve"
        );

        write(&file, "# A").expect("file should be written");
        assert_eq!(resolve(&file), Some(root.join("a.md")));

        assert_eq!(resolve(&dir.path().join("missing/a.md")), None);
    }

    #[test]
    fn relevant_changes() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let root = dir.path().canonicalize().expect("directory should exist");
        let source = root.join("a.md");
        let other = root.join("notes.txt");
        let manifest_path = root.join("index.json");

        let manifest = Manifest::from_json(
            &serde_json::json!([{ "source": source, "url_path": "a.html", "title": "A" }])
                .to_string(),
        )
        .expect("parsing should succeed");
        let watched = watched_files(&manifest_path, &manifest);
        assert_eq!(watched.len(), 2);

        let mut changed = Vec::new();

        let modify = EventKind::Modify(ModifyKind::Data(DataChange::Content));
        absorb(Ok(Event::new(modify).add_path(other)), &watched, &mut changed);
        assert!(changed.is_empty(), "unwatched files should be ignored");

        let access = EventKind::Access(AccessKind::Any);
        absorb(Ok(Event::new(access).add_path(source.clone())), &watched, &mut changed);
        assert!(changed.is_empty(), "reads should be ignored");

        absorb(Ok(Event::new(modify).add_path(source.clone())), &watched, &mut changed);
        absorb(
            Ok(Event::new(EventKind::Create(CreateKind::File)).add_path(source.clone())),
            &watched,
            &mut changed,
        );
        absorb(Ok(Event::new(modify).add_path(manifest_path.clone())), &watched, &mut changed);
        assert_eq!(changed, [source, manifest_path]);
    }

    #[test]
    fn coalesced_changes() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let root = dir.path().canonicalize().expect("directory should exist");
        let source = root.join("a.md");
        let manifest_path = root.join("index.json");

        let manifest = Manifest::from_json(
            &serde_json::json!([{ "source": source, "url_path": "a.html", "title": "A" }])
                .to_string(),
        )
        .expect("parsing should succeed");
        let watched = watched_files(&manifest_path, &manifest);

        let (tx, rx) = channel();
        let modify = EventKind::Modify(ModifyKind::Data(DataChange::Content));
        for path in [&source, &manifest_path, &source, &root.join("notes.txt")] {
            tx.send(Ok(Event::new(modify).add_path(path.clone())))
                .expect("event should be sent");
        }

        assert_eq!(
            next_changes(&rx, &watched),
            Some(vec![source.clone(), manifest_path]),
            "a burst of changes should be reported once, without duplicates"
        );

        tx.send(Ok(Event::new(modify).add_path(source)))
            .expect("event should be sent");
        drop(tx);
        assert_eq!(
            next_changes(&rx, &watched),
            None,
            "watching should end once the watcher is gone"
        );
    }

    #[test]
    fn unreadable_manifest() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let manifest_path = dir.path().join("index.json");
        let site = || Site::new(&manifest_path, &dir.path().join("htdocs"), PageBuilder::new());

        assert!(spawn(site()).is_err(), "a missing manifest should be reported");

        write(&manifest_path, "{}").expect("file should be written");
        assert!(spawn(site()).is_err(), "an invalid manifest should be reported");
    }
}
