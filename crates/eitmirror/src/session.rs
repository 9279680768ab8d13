//! Bootstrapping a renderer from a host and keeping it updated.
//!
//! Bootstrap fetches, in order, the electrodes config, the initial vertices and
//! (for host-provided colors) the initial colors, and builds the renderer from
//! them. The update loop then polls the host on a fixed interval and applies each
//! payload through a weak [`UpdateHandle`]. The loop never keeps the renderer
//! alive: once the renderer is dropped, the next completion is discarded and the
//! loop ends.

use std::sync::Arc;
use std::time::Duration;

use eitmirror_client::{ClientError, Endpoint, MirrorClient, MirrorSource};
use eitmirror_core::{ColorSource, DecodeError, ElectrodesConfig, RendererOptions};
use eitmirror_render::{
    ConstructionError, ImpedanceRenderer, RenderBackend, UpdateError, UpdateHandle,
};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::{ConfigError, MirrorConfig};

/// Errors raised while setting up a session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("failed to create renderer: {0}")]
    Construction(#[from] ConstructionError),

    #[error("initial {endpoint} rejected: {source}")]
    Update {
        endpoint: Endpoint,
        #[source]
        source: UpdateError,
    },
}

/// Why an update loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// [`UpdateTask::stop`] was called or the task handle was dropped.
    Requested,
    /// The renderer no longer exists.
    RendererDropped,
}

/// Progress reported by a running update loop.
#[derive(Debug)]
pub enum SessionEvent {
    /// An update from `endpoint` was accepted.
    Applied { endpoint: Endpoint },
    /// An update from `endpoint` was rejected; the previous data is still displayed.
    Rejected {
        endpoint: Endpoint,
        error: DecodeError,
    },
    /// The request to `endpoint` failed.
    RequestFailed {
        endpoint: Endpoint,
        error: ClientError,
    },
    /// The loop ended. Always the last event.
    Stopped(StopReason),
}

/// A bootstrapped connection to a host, ready to start polling.
pub struct MirrorSession<S> {
    source: Arc<S>,
    handle: UpdateHandle,
    electrodes: ElectrodesConfig,
    color_source: ColorSource,
    poll_interval: Duration,
}

impl MirrorSession<MirrorClient> {
    /// Connects to the host named in `config` and builds a renderer on `backend`.
    pub async fn connect<B: RenderBackend>(
        config: &MirrorConfig,
        backend: B,
    ) -> Result<(Self, ImpedanceRenderer<B>), SessionError> {
        config.validate()?;
        let client = MirrorClient::with_timeout(config.host_url()?, config.request_timeout())?;
        log::info!("connecting to {}", client.host_address());
        Self::bootstrap(
            Arc::new(client),
            backend,
            config.renderer.clone(),
            config.poll_interval(),
        )
        .await
    }
}

impl<S: MirrorSource + 'static> MirrorSession<S> {
    /// Fetches the initial state from `source` and builds a renderer on `backend`.
    ///
    /// Any request failure aborts the bootstrap; no renderer is returned.
    pub async fn bootstrap<B: RenderBackend>(
        source: Arc<S>,
        backend: B,
        options: RendererOptions,
        poll_interval: Duration,
    ) -> Result<(Self, ImpedanceRenderer<B>), SessionError> {
        let electrodes = source.electrodes_config().await?;
        let vertices = source.vertices_config().await?;

        let color_source = options.color_source;
        let renderer = ImpedanceRenderer::new(backend, &vertices, options)?;
        renderer.set_electrodes(electrodes);

        if color_source == ColorSource::Host {
            let colors = source.color_config().await?;
            renderer
                .apply_color_update(&colors)
                .map_err(|e| SessionError::Update {
                    endpoint: Endpoint::ColorsConfig,
                    source: e.into(),
                })?;
        }

        log::info!(
            "mirror session ready: {} vertices, {} electrodes",
            renderer.count(),
            electrodes.count
        );

        let session = Self {
            source,
            handle: renderer.update_handle(),
            electrodes,
            color_source,
            poll_interval,
        };
        Ok((session, renderer))
    }

    /// Electrodes reported by the host at bootstrap.
    pub fn electrodes(&self) -> ElectrodesConfig {
        self.electrodes
    }

    /// Handle to the renderer this session feeds.
    pub fn update_handle(&self) -> &UpdateHandle {
        &self.handle
    }

    /// Polls the host for one vertices update (and a color update for host colors)
    /// and applies what arrives.
    ///
    /// Returns `None` once the renderer is gone.
    pub async fn poll_once(&self) -> Option<Vec<SessionEvent>> {
        let polled =
            poll_once(self.source.as_ref(), &self.handle, self.color_source, || false).await;
        match polled {
            Polled::Events(events) => Some(events),
            Polled::Stopped | Polled::RendererDropped => None,
        }
    }

    /// Starts the update loop on the tokio runtime.
    pub fn spawn_updates(self) -> UpdateTask {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let join = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let reason = loop {
                tokio::select! {
                    // Only `true` is ever sent; a closed channel means the task handle is gone
                    _ = stop_rx.changed() => break StopReason::Requested,
                    _ = interval.tick() => {}
                }

                // A dropped task handle counts as a stop request
                let stopped = || *stop_rx.borrow() || stop_rx.has_changed().is_err();
                let polled =
                    poll_once(self.source.as_ref(), &self.handle, self.color_source, stopped).await;
                let events = match polled {
                    Polled::Events(events) => events,
                    Polled::Stopped => break StopReason::Requested,
                    Polled::RendererDropped => break StopReason::RendererDropped,
                };
                for event in events {
                    let _ = event_tx.send(event);
                }
            };

            log::info!("update loop stopped: {reason:?}");
            let _ = event_tx.send(SessionEvent::Stopped(reason));
        });

        UpdateTask {
            stop: stop_tx,
            events: event_rx,
            join,
        }
    }
}

/// Outcome of one poll.
enum Polled {
    Events(Vec<SessionEvent>),
    /// A stop was requested while a request was in flight; its response was discarded.
    Stopped,
    RendererDropped,
}

/// Requests the updates one after another. `stopped` is checked after each response
/// arrives and before anything is applied.
async fn poll_once<S, F>(
    source: &S,
    handle: &UpdateHandle,
    color_source: ColorSource,
    stopped: F,
) -> Polled
where
    S: MirrorSource + ?Sized,
    F: Fn() -> bool,
{
    let mut events = Vec::with_capacity(2);

    let vertices = source.vertices_update().await;
    if stopped() {
        return Polled::Stopped;
    }
    match apply(handle, Endpoint::VerticesUpdate, vertices) {
        Some(event) => events.push(event),
        None => return Polled::RendererDropped,
    }

    if color_source == ColorSource::Host {
        let colors = source.color_update().await;
        if stopped() {
            return Polled::Stopped;
        }
        match apply(handle, Endpoint::ColorsUpdate, colors) {
            Some(event) => events.push(event),
            None => return Polled::RendererDropped,
        }
    }

    Polled::Events(events)
}

/// Applies one response, or returns `None` if the renderer is gone.
fn apply(
    handle: &UpdateHandle,
    endpoint: Endpoint,
    response: Result<Vec<u8>, ClientError>,
) -> Option<SessionEvent> {
    let bytes = match response {
        Ok(bytes) => bytes,
        Err(error) => {
            if !handle.is_alive() {
                return None;
            }
            log::warn!("{endpoint} request failed: {error}");
            return Some(SessionEvent::RequestFailed { endpoint, error });
        }
    };

    let result = match endpoint {
        Endpoint::ColorsConfig | Endpoint::ColorsUpdate => handle.apply_color_update(&bytes),
        _ => handle.apply_vertex_update(&bytes),
    };
    match result {
        Ok(()) => Some(SessionEvent::Applied { endpoint }),
        Err(UpdateError::Decode(error)) => Some(SessionEvent::Rejected { endpoint, error }),
        Err(UpdateError::RendererDropped) => None,
    }
}

/// A running update loop.
pub struct UpdateTask {
    stop: watch::Sender<bool>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    join: JoinHandle<()>,
}

impl UpdateTask {
    /// Asks the loop to stop. A request in flight is discarded when it completes.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// Waits for the next event. Returns `None` after [`SessionEvent::Stopped`].
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Stops the loop and waits for it to finish.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.join.await {
            log::warn!("update loop panicked: {e}");
        }
    }

    /// Returns true once the loop has ended.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
