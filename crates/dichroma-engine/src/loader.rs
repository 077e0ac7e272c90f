//! Coalescing LUT switch protocol.
//!
//! At most one table build runs at a time and at most one request waits
//! behind it. A request arriving while another already waits replaces it, so
//! rapid switching A, B, C builds A and then C, never B. When a build
//! finishes and something newer is waiting, the finished table is dropped and
//! the waiting one is built. The identity table needs no build and is
//! installed immediately; it also invalidates any build in flight.
//!
//! Frames keep rendering with the previous table for the whole time a build
//! runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dichroma_core::lut::IDENTITY_NAME;
use dichroma_core::{ColorLut, LutBuilder};
use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::events::{EventBus, ProcessorEvent};
use crate::slot::LutSlot;
use crate::source::{LutLocator, LutSource, LutSourceError};

/// Identifies one build.
#[derive(Debug, Clone)]
struct LoadToken {
    id: u64,
    locator: LutLocator,
}

/// The request waiting behind the build in flight.
#[derive(Debug)]
enum NextRequest {
    Identity,
    Asset(LutLocator),
}

#[derive(Debug, Default)]
enum LoadState {
    #[default]
    Idle,
    Building(LoadToken),
    Pending {
        building: LoadToken,
        next: NextRequest,
    },
}

/// Loads tables in the background and publishes them to a [`LutSlot`].
#[derive(Clone)]
pub struct LutLoader {
    shared: Arc<LoaderShared>,
}

struct LoaderShared {
    source: Arc<dyn LutSource>,
    builder: LutBuilder,
    slot: LutSlot,
    events: EventBus,
    runtime: Handle,
    state: Mutex<LoadState>,
    next_id: AtomicU64,
}

impl LutLoader {
    /// Builds are spawned on `runtime`.
    pub fn new(
        source: Arc<dyn LutSource>,
        builder: LutBuilder,
        slot: LutSlot,
        events: EventBus,
        runtime: Handle,
    ) -> Self {
        Self {
            shared: Arc::new(LoaderShared {
                source,
                builder,
                slot,
                events,
                runtime,
                state: Mutex::new(LoadState::Idle),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Switch to the table at `locator`, or to identity for `None`.
    ///
    /// Returns immediately. Progress is reported through the event bus.
    pub fn request(&self, locator: Option<LutLocator>) {
        match locator {
            None => self.shared.install_identity(),
            Some(locator) => self.shared.request_asset(locator),
        }
    }

    /// True while a build is in flight.
    pub fn is_busy(&self) -> bool {
        !matches!(*self.shared.state.lock(), LoadState::Idle)
    }

    pub fn slot(&self) -> &LutSlot {
        &self.shared.slot
    }
}

impl LoaderShared {
    fn token(&self, locator: LutLocator) -> LoadToken {
        LoadToken {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            locator,
        }
    }

    fn install_identity(&self) {
        let mut state = self.state.lock();
        *state = match std::mem::take(&mut *state) {
            LoadState::Idle => LoadState::Idle,
            LoadState::Building(building) | LoadState::Pending { building, .. } => {
                tracing::debug!(
                    "identity requested, build of {} will be discarded",
                    building.locator
                );
                LoadState::Pending {
                    building,
                    next: NextRequest::Identity,
                }
            }
        };

        self.slot.publish(Arc::new(ColorLut::identity()));
        tracing::info!("active LUT: {IDENTITY_NAME}");
        self.events.emit(ProcessorEvent::LutLoaded {
            name: IDENTITY_NAME.to_string(),
            locator: None,
        });
    }

    fn request_asset(self: &Arc<Self>, locator: LutLocator) {
        let mut state = self.state.lock();
        match std::mem::take(&mut *state) {
            LoadState::Idle => {
                let token = self.token(locator);
                *state = LoadState::Building(token.clone());
                drop(state);
                self.spawn_build(token);
            }
            LoadState::Building(building) | LoadState::Pending { building, .. }
                if building.locator == locator =>
            {
                tracing::debug!("{locator} is already building");
                *state = LoadState::Building(building);
            }
            LoadState::Building(building) | LoadState::Pending { building, .. } => {
                tracing::debug!("{locator} queued behind {}", building.locator);
                *state = LoadState::Pending {
                    building,
                    next: NextRequest::Asset(locator),
                };
            }
        }
    }

    fn spawn_build(self: &Arc<Self>, token: LoadToken) {
        tracing::info!("loading LUT {}", token.locator);
        self.events.emit(ProcessorEvent::LutLoading {
            locator: token.locator.clone(),
        });

        let shared = Arc::clone(self);
        self.runtime.spawn(async move {
            let result = shared.fetch_and_build(&token.locator).await;
            shared.complete(token, result);
        });
    }

    async fn fetch_and_build(&self, locator: &LutLocator) -> Result<ColorLut, LutSourceError> {
        let image = self.source.fetch(locator).await?;
        let builder = self.builder;
        let name = locator.name.clone();
        let lut = tokio::task::spawn_blocking(move || builder.build(&name, &image))
            .await
            .map_err(|e| LutSourceError::Source(format!("build task failed: {e}")))??;
        Ok(lut)
    }

    fn complete(self: &Arc<Self>, token: LoadToken, result: Result<ColorLut, LutSourceError>) {
        let mut state = self.state.lock();
        match std::mem::take(&mut *state) {
            LoadState::Building(building) if building.id == token.id => {
                self.finish(&token.locator, result);
            }
            LoadState::Pending { building, next } if building.id == token.id => match next {
                NextRequest::Identity => {
                    tracing::debug!("discarding {} after switch to identity", token.locator);
                }
                NextRequest::Asset(next) if next == token.locator => {
                    self.finish(&token.locator, result);
                }
                NextRequest::Asset(next) => {
                    tracing::debug!("discarding superseded {}", token.locator);
                    let token = self.token(next);
                    *state = LoadState::Building(token.clone());
                    drop(state);
                    self.spawn_build(token);
                }
            },
            other => {
                tracing::warn!("ignoring completion of unknown build {}", token.locator);
                *state = other;
            }
        }
    }

    fn finish(&self, locator: &LutLocator, result: Result<ColorLut, LutSourceError>) {
        match result {
            Ok(lut) => {
                let name = lut.name().to_string();
                self.slot.publish(Arc::new(lut));
                tracing::info!("active LUT: {locator}");
                self.events.emit(ProcessorEvent::LutLoaded {
                    name,
                    locator: Some(locator.clone()),
                });
            }
            Err(e) => {
                tracing::error!("failed to load LUT {locator}: {e}");
                self.events.emit(ProcessorEvent::LutFailed {
                    locator: locator.clone(),
                    message: e.to_string(),
                });
            }
        }
    }
}
