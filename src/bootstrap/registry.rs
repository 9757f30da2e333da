use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::loader::{FnLoader, SegmentLoader};
use crate::error::SegmentError;

/// synchronous "can this segment run now?" predicate
pub type ReadinessCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// what the bootstrapper does with a segment whose gate is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WhenUnready {
    /// leave it for a later pass
    Skip,
    /// hand it to a background task that runs it once the gate opens
    Defer,
}

#[derive(Clone)]
pub struct Gate {
    check: ReadinessCheck,
    when_unready: WhenUnready,
}

impl Gate {
    pub fn skip<F>(check: F) -> Gate
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Gate {
            check: Arc::new(check),
            when_unready: WhenUnready::Skip,
        }
    }

    pub fn defer<F>(check: F) -> Gate
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Gate {
            check: Arc::new(check),
            when_unready: WhenUnready::Defer,
        }
    }

    pub fn is_ready(&self) -> bool {
        (self.check)()
    }

    pub fn when_unready(&self) -> WhenUnready {
        self.when_unready
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate")
            .field("when_unready", &self.when_unready)
            .finish()
    }
}

/// one named unit of cache-population work
pub struct Segment {
    name: String,
    order: usize,
    loader: Arc<dyn SegmentLoader>,
    gate: Option<Gate>,
    // set while a deferred run is waiting in the background
    pub(crate) deferred: Arc<AtomicBool>,
}

impl Segment {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// position in registration order
    pub fn order(&self) -> usize {
        self.order
    }

    pub fn gate(&self) -> Option<&Gate> {
        self.gate.as_ref()
    }

    pub fn loader(&self) -> Arc<dyn SegmentLoader> {
        self.loader.clone()
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("name", &self.name)
            .field("order", &self.order)
            .field("gate", &self.gate)
            .finish()
    }
}

/// ordered list of segments.  Names are not de-duplicated; registering a name twice
/// adds a second run step.
#[derive(Debug, Default)]
pub struct SegmentRegistry {
    segments: Vec<Segment>,
}

impl SegmentRegistry {
    pub fn new() -> SegmentRegistry {
        SegmentRegistry::default()
    }

    pub fn register<L>(&mut self, name: impl Into<String>, loader: L, gate: Option<Gate>) -> &mut Self
    where
        L: SegmentLoader + 'static,
    {
        self.register_arc(name, Arc::new(loader), gate)
    }

    pub fn register_arc(
        &mut self,
        name: impl Into<String>,
        loader: Arc<dyn SegmentLoader>,
        gate: Option<Gate>,
    ) -> &mut Self {
        let order = self.segments.len();
        self.segments.push(Segment {
            name: name.into(),
            order,
            loader,
            gate,
            deferred: Arc::new(AtomicBool::new(false)),
        });
        self
    }

    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, f: F, gate: Option<Gate>) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<usize, SegmentError>> + Send + 'static,
    {
        self.register(name, FnLoader::new(f), gate)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }
}
