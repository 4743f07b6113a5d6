//! Typed watch events and their derivation from raw `notify` events.

use std::path::PathBuf;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

/// What happened to a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    Added,
    Changed,
    Removed,
}

impl WatchEventKind {
    /// Past-tense label shown in status lines.
    pub fn label(self) -> &'static str {
        match self {
            WatchEventKind::Added => "created",
            WatchEventKind::Changed => "changed",
            WatchEventKind::Removed => "removed",
        }
    }
}

/// A single change notification for one absolute source path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
}

impl WatchEvent {
    pub fn new(kind: WatchEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn added(path: impl Into<PathBuf>) -> Self {
        Self::new(WatchEventKind::Added, path)
    }

    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self::new(WatchEventKind::Changed, path)
    }

    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self::new(WatchEventKind::Removed, path)
    }
}

/// Everything the orchestrator receives from the watcher, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchSignal {
    Event(WatchEvent),
    /// Sent once, after the `Added` event of the last pre-existing file.
    InitialScanComplete,
}

impl From<WatchEvent> for WatchSignal {
    fn from(event: WatchEvent) -> Self {
        WatchSignal::Event(event)
    }
}

/// Translate a raw `notify` event into zero or more typed events.
///
/// Access and metadata-only events are dropped. Renames become a removal of
/// the old name and an addition of the new one, taken from the `From` and
/// `To` halves; the paired `Both` event is dropped. A rename whose direction
/// the backend does not report is resolved by checking whether the path
/// exists.
pub fn classify(event: &Event) -> Vec<WatchEvent> {
    let each = |kind: WatchEventKind| -> Vec<WatchEvent> {
        event
            .paths
            .iter()
            .map(|path| WatchEvent::new(kind, path.clone()))
            .collect()
    };

    match event.kind {
        EventKind::Create(_) => each(WatchEventKind::Added),
        EventKind::Remove(_) => each(WatchEventKind::Removed),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => each(WatchEventKind::Removed),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => each(WatchEventKind::Added),
        // Backends that pair a rename also send its From and To halves
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => Vec::new(),
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|path| {
                if path.exists() {
                    WatchEvent::added(path.clone())
                } else {
                    WatchEvent::removed(path.clone())
                }
            })
            .collect(),
        EventKind::Modify(_) => each(WatchEventKind::Changed),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};

    fn raw(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |event, p| event.add_path(PathBuf::from(p)))
    }

    #[test]
    fn test_create_is_added() {
        let events = classify(&raw(EventKind::Create(CreateKind::File), &["/src/a.ts"]));
        assert_eq!(events, vec![WatchEvent::added("/src/a.ts")]);
    }

    #[test]
    fn test_data_modify_is_changed() {
        let events = classify(&raw(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/src/a.ts"],
        ));
        assert_eq!(events, vec![WatchEvent::changed("/src/a.ts")]);
    }

    #[test]
    fn test_remove_is_removed() {
        let events = classify(&raw(EventKind::Remove(RemoveKind::File), &["/src/a.ts"]));
        assert_eq!(events, vec![WatchEvent::removed("/src/a.ts")]);
    }

    #[test]
    fn test_paired_rename_is_left_to_its_halves() {
        let events = classify(&raw(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/src/old.ts", "/src/new.ts"],
        ));
        assert!(events.is_empty());
    }

    #[test]
    fn test_rename_halves() {
        let from = classify(&raw(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/src/old.ts"],
        ));
        let to = classify(&raw(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/src/new.ts"],
        ));
        assert_eq!(from, vec![WatchEvent::removed("/src/old.ts")]);
        assert_eq!(to, vec![WatchEvent::added("/src/new.ts")]);
    }

    #[test]
    fn test_ambiguous_rename_of_missing_path_is_removed() {
        let events = classify(&raw(
            EventKind::Modify(ModifyKind::Name(RenameMode::Any)),
            &["/definitely/not/here.ts"],
        ));
        assert_eq!(events, vec![WatchEvent::removed("/definitely/not/here.ts")]);
    }

    #[test]
    fn test_access_and_metadata_are_dropped() {
        assert!(classify(&raw(EventKind::Access(AccessKind::Any), &["/src/a.ts"])).is_empty());
        assert!(
            classify(&raw(
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
                &["/src/a.ts"]
            ))
            .is_empty()
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(WatchEventKind::Added.label(), "created");
        assert_eq!(WatchEventKind::Changed.label(), "changed");
        assert_eq!(WatchEventKind::Removed.label(), "removed");
    }
}
