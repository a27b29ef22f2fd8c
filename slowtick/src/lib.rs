//! slowtick: audio tick scheduling for slideshow scenes.
//!
//! A track with ticking enabled restarts itself on every tick. Ticks come
//! from a [`TickScheduler`] session whose delays follow one of the
//! [`TickMode`]s, or from scene changes when the track is scene-linked.

pub mod bpm;
pub mod config;
pub mod delay;
pub mod error;
pub mod format;
pub mod mode;
pub mod owner;
pub mod scheduler;
pub mod store;
pub mod tempo;
pub mod timer;

pub use config::{TickConfig, TickSettings};
pub use delay::{next_delay, Delay, FALLBACK_DELAY_MS};
pub use error::{BpmError, StoreError, TickError};
pub use mode::{BeatMultiplier, TickMode};
pub use owner::TickOwner;
pub use scheduler::{SessionState, TickScheduler, TickSession};
pub use store::{AudioTrack, AudioUpdate, Scene, SceneStore};
pub use timer::{DeadlineTimer, ManualTimer, TimerFacility, TimerHandle};
