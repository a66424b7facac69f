//! Location and connectivity seams injected into the orchestrator.

use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};

use tokio::sync::watch;

/// Immutable copy of a position taken at one point in time.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationSnapshot {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl LocationSnapshot {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both coordinates are finite numbers.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Source of position updates.
///
/// The orchestrator subscribes once when it is created and drops the receiver when
/// it is closed, which is the unsubscribe. `None` means no position is known yet.
pub trait LocationProvider {
    fn subscribe(&self) -> watch::Receiver<Option<LocationSnapshot>>;
}

/// In-process [`LocationProvider`] that fans the latest known position out to subscribers.
///
/// ```rust
/// use pinpoint::{LocationProvider, LocationSnapshot, LocationTracker};
///
/// let tracker = LocationTracker::new();
/// let rx = tracker.subscribe();
/// tracker.update(LocationSnapshot::new(51.5072, -0.1276));
/// assert_eq!(*rx.borrow(), Some(LocationSnapshot::new(51.5072, -0.1276)));
/// ```
#[derive(Debug, Clone)]
pub struct LocationTracker {
    tx: Arc<watch::Sender<Option<LocationSnapshot>>>,
}

impl LocationTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(None)
    }

    #[must_use]
    pub fn starting_at(initial: Option<LocationSnapshot>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Publish a new position to every subscriber.
    pub fn update(&self, snapshot: LocationSnapshot) {
        self.tx.send_replace(Some(snapshot));
    }

    /// Forget the current position, e.g. when the region becomes unavailable.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    #[must_use]
    pub fn last_known(&self) -> Option<LocationSnapshot> {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LocationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationProvider for LocationTracker {
    fn subscribe(&self) -> watch::Receiver<Option<LocationSnapshot>> {
        self.tx.subscribe()
    }
}

/// Network reachability as reported by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    Online,
    Offline,
    /// Reachability has not been determined; treated like offline when dispatching.
    #[default]
    Unknown,
}

impl Connectivity {
    #[must_use]
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }

    const fn to_raw(self) -> u8 {
        match self {
            Self::Online => 0,
            Self::Offline => 1,
            Self::Unknown => 2,
        }
    }

    const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Online,
            1 => Self::Offline,
            _ => Self::Unknown,
        }
    }
}

/// Queried synchronously before every dispatch.
pub trait ConnectivityProvider {
    fn connectivity(&self) -> Connectivity;
}

/// Connectivity that never changes.
#[derive(Debug, Clone, Copy)]
pub struct StaticConnectivity(pub Connectivity);

impl ConnectivityProvider for StaticConnectivity {
    fn connectivity(&self) -> Connectivity {
        self.0
    }
}

/// Connectivity flag that can be flipped from outside the orchestrator.
#[derive(Debug, Clone)]
pub struct SharedConnectivity {
    state: Arc<AtomicU8>,
}

impl SharedConnectivity {
    #[must_use]
    pub fn new(initial: Connectivity) -> Self {
        Self {
            state: Arc::new(AtomicU8::new(initial.to_raw())),
        }
    }

    pub fn set(&self, connectivity: Connectivity) {
        self.state.store(connectivity.to_raw(), Ordering::Release);
    }
}

impl Default for SharedConnectivity {
    fn default() -> Self {
        Self::new(Connectivity::default())
    }
}

impl ConnectivityProvider for SharedConnectivity {
    fn connectivity(&self) -> Connectivity {
        Connectivity::from_raw(self.state.load(Ordering::Acquire))
    }
}

impl<T: ConnectivityProvider + ?Sized> ConnectivityProvider for Arc<T> {
    fn connectivity(&self) -> Connectivity {
        (**self).connectivity()
    }
}
