//! The location picker behind the "Add Place" form.
//!
//! The picker owns the current coordinate. Every coordinate it adopts (from
//! the device, from the map screen, or the configured default) is reverse
//! geocoded on a spawned task, and the parent hears about the result through
//! [`PickerListener`]. Each resolution is tagged with a sequence number; only
//! the newest one is delivered, and nothing is delivered once the picker has
//! been torn down.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{build_preview_url, AddressLookup};
use crate::config::MapsConfig;
use crate::error::{GeoError, LocationError};
use crate::location::PositionSource;
use crate::models::{Coordinate, MapSelection, PickedLocation, Route};
use crate::permission::{verify_permissions, PermissionProvider};

pub const PLACEHOLDER_TEXT: &str = "No location chosen yet.";

/// Parent side of the picker.
pub trait PickerListener: Send + Sync + 'static {
    /// A coordinate and its address are both known.
    fn on_pick_location(&self, location: PickedLocation);

    /// The address for the newest coordinate could not be resolved.
    fn on_resolve_error(&self, coord: Coordinate, error: GeoError) {
        warn!("Could not resolve address for {}: {}", coord, error);
    }
}

pub trait Navigator {
    fn navigate(&self, route: Route);
}

/// What the picker's preview area should show.
#[derive(Debug, Clone, PartialEq)]
pub enum PickerView {
    Preview { coordinate: Coordinate, url: String },
    Placeholder(&'static str),
}

pub struct LocationPicker<L: AddressLookup> {
    current: Coordinate,
    lookup: Arc<L>,
    listener: Arc<dyn PickerListener>,
    maps: MapsConfig,
    seq: Arc<AtomicU64>,
    alive: Arc<AtomicBool>,
}

impl<L> LocationPicker<L>
where
    L: AddressLookup + Send + Sync + 'static,
{
    /// Creates the picker at `initial`.
    ///
    /// A real initial coordinate is resolved straight away, as if it had just
    /// been picked; the unset sentinel is not. Must be called inside a tokio
    /// runtime.
    pub fn new(
        initial: Coordinate,
        maps: MapsConfig,
        lookup: Arc<L>,
        listener: Arc<dyn PickerListener>,
    ) -> Self {
        let mut picker = Self {
            current: initial,
            lookup,
            listener,
            maps,
            seq: Arc::new(AtomicU64::new(0)),
            alive: Arc::new(AtomicBool::new(true)),
        };
        if !initial.is_unset() {
            picker.set_location(initial);
        }
        picker
    }

    /// Adopts `coord` and starts resolving its address.
    ///
    /// The returned handle completes once the resolution has either been
    /// delivered or discarded as stale.
    pub fn set_location(&mut self, coord: Coordinate) -> JoinHandle<()> {
        self.current = coord;
        let ticket = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Resolving {} (request #{})", coord, ticket);

        let lookup = Arc::clone(&self.lookup);
        let listener = Arc::clone(&self.listener);
        let seq = Arc::clone(&self.seq);
        let alive = Arc::clone(&self.alive);

        tokio::spawn(async move {
            let result = lookup.resolve_address(coord).await;

            if !alive.load(Ordering::SeqCst) {
                debug!("Picker gone, dropping result for request #{}", ticket);
                return;
            }
            if seq.load(Ordering::SeqCst) != ticket {
                debug!("Request #{} superseded, dropping result", ticket);
                return;
            }

            match result {
                Ok(address) => listener.on_pick_location(PickedLocation::with_address(coord, address)),
                Err(e) => listener.on_resolve_error(coord, e),
            }
        })
    }

    /// Navigation focus changed. A focused screen carrying a map selection
    /// adopts it.
    pub fn on_focus(&mut self, focused: bool, params: Option<MapSelection>) -> Option<JoinHandle<()>> {
        match (focused, params) {
            (true, Some(selection)) => {
                info!(
                    "Adopting map selection ({}, {})",
                    selection.picked_lat, selection.picked_lng
                );
                Some(self.set_location(selection.into()))
            }
            _ => None,
        }
    }

    /// "Locate User": checks permission, reads the device position and adopts
    /// it. Returns `Ok(None)` when permission is not granted.
    pub async fn locate<P, S>(
        &mut self,
        permissions: &P,
        positions: &S,
    ) -> Result<Option<JoinHandle<()>>, LocationError>
    where
        P: PermissionProvider,
        S: PositionSource,
    {
        match locate_device(permissions, positions).await? {
            Some(coord) => Ok(Some(self.set_location(coord))),
            None => Ok(None),
        }
    }
}

// Nothing here spawns, so no Send + Sync bounds.
impl<L: AddressLookup> LocationPicker<L> {
    pub fn current(&self) -> Coordinate {
        self.current
    }

    /// "Pick on Map": hands over to the map screen, which answers through
    /// [`on_focus`](Self::on_focus).
    pub fn pick_on_map<N: Navigator>(&self, navigator: &N) {
        navigator.navigate(Route::Map);
    }

    pub fn view(&self) -> PickerView {
        if self.current.is_unset() {
            PickerView::Placeholder(PLACEHOLDER_TEXT)
        } else {
            PickerView::Preview {
                coordinate: self.current,
                url: build_preview_url(&self.maps, self.current),
            }
        }
    }

    /// Stops any in-flight resolution from reaching the listener.
    pub fn teardown(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

impl<L: AddressLookup> Drop for LocationPicker<L> {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

/// Permission check plus position read, without touching any picker.
///
/// Split out so the host app can run it on a background task and adopt the
/// result when it arrives.
pub async fn locate_device<P, S>(permissions: &P, positions: &S) -> Result<Option<Coordinate>, LocationError>
where
    P: PermissionProvider,
    S: PositionSource,
{
    if !verify_permissions(permissions).await {
        debug!("Location permission not granted, skipping locate");
        return Ok(None);
    }
    let position = positions.current_position().await?;
    Ok(Some(position.into()))
}
