//! Audio playback, transport, and visualization.
//!
//! This module provides file playback through rodio. It supports:
//! - Media elements opened per playlist item, with event listeners
//! - A transport controller mirroring play/pause/seek/volume/mute
//! - A spectrum visualizer fed by a tap on the playing output

pub mod element;
pub mod engine;
pub mod transport;
pub mod visualizer;

pub use element::{ElementError, ElementFactory, ElementId, MediaElement, MediaEvent};
pub use engine::RodioBackend;
pub use transport::{Transport, TransportSignal, TransportState};
pub use visualizer::{FrameScheduler, SampleTap, Visualizer};
