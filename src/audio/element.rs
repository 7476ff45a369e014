//! Media element abstraction.
//!
//! A media element is one opened, playable item. The transport drives it
//! through the `MediaElement` trait and learns about its state through
//! `MediaEvent`s delivered to subscribed listeners. Elements are created by
//! an `ElementFactory`, which lets the player run against a real audio
//! device or a test double.

use super::visualizer::SampleTap;
use crate::media::{MediaItem, MediaKind};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;

/// Global counter for generating unique element IDs.
static ELEMENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Global counter for generating unique listener IDs.
static LISTENER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of one element instance.
///
/// Two elements opened for the same item have different IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(u64);

impl ElementId {
    pub fn new() -> Self {
        Self(ELEMENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        Self(LISTENER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Events reported by a media element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    /// Playback started.
    Playing,
    /// Playback paused.
    Paused,
    /// Total duration became known, in seconds.
    DurationChanged(f64),
    /// Playback position moved, in seconds.
    TimeUpdate(f64),
    /// Playback reached the end of the media.
    Ended,
}

/// Errors reported by media elements and their factories.
#[derive(Debug, Error)]
pub enum ElementError {
    /// The media file could not be opened.
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The media could not be decoded.
    #[error("cannot decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },
    /// The audio output is unavailable.
    #[error("audio output error: {0}")]
    Output(String),
    /// The host refused to start playback, e.g. a finished item whose file
    /// can no longer be reloaded.
    #[error("playback rejected: {0}")]
    PlaybackRejected(String),
}

/// A single opened media item that can be played.
pub trait MediaElement {
    /// Returns the element's identity.
    fn id(&self) -> ElementId;

    /// Returns the kind of media being played.
    fn kind(&self) -> MediaKind;

    /// Starts or resumes playback.
    ///
    /// Emits `Playing` to listeners on success. Playback that already
    /// reached the end restarts from the beginning.
    fn play(&mut self) -> Result<(), ElementError>;

    /// Pauses playback. Emits `Paused`.
    fn pause(&mut self);

    /// Moves the playback position, in seconds.
    fn set_position(&mut self, seconds: f64);

    /// Sets the output volume (0.0 to 1.0).
    fn set_volume(&mut self, volume: f32);

    /// Mutes or unmutes output without changing the volume.
    fn set_muted(&mut self, muted: bool);

    /// Registers a listener for this element's events.
    fn subscribe(&mut self, listener: Sender<MediaEvent>) -> ListenerId;

    /// Removes a listener. Returns false if it was not registered.
    fn unsubscribe(&mut self, id: ListenerId) -> bool;

    /// Number of registered listeners.
    fn listener_count(&self) -> usize;

    /// Emits time and end-of-media events. Called once per UI tick.
    fn poll(&mut self);

    /// Returns a tap on the element's output for spectrum analysis.
    ///
    /// Only audio elements provide one.
    fn analysis_tap(&self) -> Option<SampleTap>;
}

/// Opens media elements for playlist items.
pub trait ElementFactory {
    /// Opens `item` for playback. The element starts paused.
    fn open(&mut self, item: &MediaItem) -> Result<Box<dyn MediaElement>, ElementError>;
}

/// Listener registry shared by element implementations.
#[derive(Debug, Default)]
pub struct Listeners {
    senders: HashMap<ListenerId, Sender<MediaEvent>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener and returns its ID.
    pub fn add(&mut self, sender: Sender<MediaEvent>) -> ListenerId {
        let id = ListenerId::next();
        self.senders.insert(id, sender);
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        self.senders.remove(&id).is_some()
    }

    /// Sends an event to every listener, dropping those that hung up.
    pub fn emit(&mut self, event: MediaEvent) {
        self.senders.retain(|_, sender| sender.send(event).is_ok());
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

/// Test doubles for elements and factories.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Calls and state observed on one mock element.
    #[derive(Debug, Default)]
    pub struct MockLog {
        pub name: String,
        pub plays: usize,
        pub pauses: usize,
        pub position: f64,
        pub volume: f32,
        pub muted: bool,
        pub listeners: usize,
        pub dropped: bool,
        /// Events to emit on the element's next `poll`.
        pub queued: Vec<MediaEvent>,
    }

    pub type SharedLog = Rc<RefCell<MockLog>>;

    /// In-memory element that records everything done to it.
    pub struct MockElement {
        id: ElementId,
        kind: MediaKind,
        listeners: Listeners,
        log: SharedLog,
        reject_play: bool,
        tap: Option<SampleTap>,
        pending: Vec<MediaEvent>,
    }

    impl MockElement {
        pub fn new(kind: MediaKind, log: SharedLog) -> Self {
            log.borrow_mut().volume = 1.0;
            Self {
                id: ElementId::new(),
                kind,
                listeners: Listeners::new(),
                log,
                reject_play: false,
                tap: (kind == MediaKind::Audio).then(SampleTap::new),
                pending: Vec::new(),
            }
        }

        /// Makes every `play()` fail, like a blocked autoplay.
        pub fn rejecting(mut self) -> Self {
            self.reject_play = true;
            self
        }

        /// Queues an event to be emitted on the next `poll`.
        pub fn queue(&mut self, event: MediaEvent) {
            self.pending.push(event);
        }
    }

    impl Drop for MockElement {
        fn drop(&mut self) {
            self.log.borrow_mut().dropped = true;
        }
    }

    impl MediaElement for MockElement {
        fn id(&self) -> ElementId {
            self.id
        }

        fn kind(&self) -> MediaKind {
            self.kind
        }

        fn play(&mut self) -> Result<(), ElementError> {
            if self.reject_play {
                return Err(ElementError::PlaybackRejected("blocked".into()));
            }
            self.log.borrow_mut().plays += 1;
            self.listeners.emit(MediaEvent::Playing);
            Ok(())
        }

        fn pause(&mut self) {
            self.log.borrow_mut().pauses += 1;
            self.listeners.emit(MediaEvent::Paused);
        }

        fn set_position(&mut self, seconds: f64) {
            self.log.borrow_mut().position = seconds;
        }

        fn set_volume(&mut self, volume: f32) {
            self.log.borrow_mut().volume = volume;
        }

        fn set_muted(&mut self, muted: bool) {
            self.log.borrow_mut().muted = muted;
        }

        fn subscribe(&mut self, listener: Sender<MediaEvent>) -> ListenerId {
            let id = self.listeners.add(listener);
            self.log.borrow_mut().listeners = self.listeners.len();
            id
        }

        fn unsubscribe(&mut self, id: ListenerId) -> bool {
            let removed = self.listeners.remove(id);
            self.log.borrow_mut().listeners = self.listeners.len();
            removed
        }

        fn listener_count(&self) -> usize {
            self.listeners.len()
        }

        fn poll(&mut self) {
            let queued = std::mem::take(&mut self.log.borrow_mut().queued);
            for event in self.pending.drain(..).chain(queued) {
                self.listeners.emit(event);
            }
        }

        fn analysis_tap(&self) -> Option<SampleTap> {
            self.tap.clone()
        }
    }

    /// Factory producing `MockElement`s and keeping their logs.
    #[derive(Default)]
    pub struct MockBackend {
        pub opened: Rc<RefCell<Vec<SharedLog>>>,
        pub reject_play: bool,
        pub fail_open: Option<String>,
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Returns a handle to the logs of every element opened so far.
        pub fn logs(&self) -> Rc<RefCell<Vec<SharedLog>>> {
            Rc::clone(&self.opened)
        }
    }

    impl ElementFactory for MockBackend {
        fn open(&mut self, item: &MediaItem) -> Result<Box<dyn MediaElement>, ElementError> {
            if self.fail_open.as_deref() == Some(item.name.as_str()) {
                return Err(ElementError::Decode {
                    path: item.source.clone(),
                    reason: "mock decode failure".into(),
                });
            }
            let log = Rc::new(RefCell::new(MockLog {
                name: item.name.clone(),
                ..MockLog::default()
            }));
            self.opened.borrow_mut().push(Rc::clone(&log));
            let element = MockElement::new(item.kind, log);
            Ok(if self.reject_play {
                Box::new(element.rejecting())
            } else {
                Box::new(element)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_listeners_emit_and_remove() {
        let mut listeners = Listeners::new();
        let (tx_a, rx_a) = mpsc::channel();
        let (tx_b, rx_b) = mpsc::channel();
        let a = listeners.add(tx_a);
        let _b = listeners.add(tx_b);
        assert_eq!(listeners.len(), 2);

        listeners.emit(MediaEvent::Playing);
        assert_eq!(rx_a.try_recv(), Ok(MediaEvent::Playing));
        assert_eq!(rx_b.try_recv(), Ok(MediaEvent::Playing));

        assert!(listeners.remove(a));
        assert!(!listeners.remove(a));
        listeners.emit(MediaEvent::Ended);
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv(), Ok(MediaEvent::Ended));
    }

    #[test]
    fn test_hung_up_listeners_are_dropped() {
        let mut listeners = Listeners::new();
        let (tx, rx) = mpsc::channel();
        listeners.add(tx);
        drop(rx);
        listeners.emit(MediaEvent::Paused);
        assert!(listeners.is_empty());
    }

    #[test]
    fn test_element_ids_are_unique() {
        assert_ne!(ElementId::new(), ElementId::new());
    }
}
