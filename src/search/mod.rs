//! Time-sliced A* search and the seekers that own it.

pub mod astar;
pub mod candidate;
pub mod filter;
pub mod monitor;
pub mod seeker;

pub use astar::{is_traversable, SearchState, SearchStats, SearchStatus};
pub use candidate::PathCandidate;
pub use filter::{ResolvedFilter, SeekFilter};
pub use monitor::{MonitorEvent, RecordingMonitor, SearchMonitor};
pub use seeker::{Payload, SeekRequest, Seeker, SeekerState};
