/// ordered cache warm-up.
///
/// Segments are registered once, in the order they must run.  The bootstrapper walks
/// them on every pass, timing each, isolating failures, and honouring per-segment
/// readiness gates.  A cold-start pass holds maintenance mode for its whole duration.
///
pub mod loader;
pub mod registry;
pub mod runner;
pub mod state;

pub use loader::{FnLoader, SegmentLoader};
pub use registry::{Gate, ReadinessCheck, Segment, SegmentRegistry, WhenUnready};
pub use runner::{Bootstrapper, RunReport, SegmentOutcome, SegmentStatus};
pub use state::{BootstrapState, SharedState, REBUILD_REASON};
