use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use foundation::MarkerId;
use parking_lot::{Mutex, RwLock};
use runtime::{Inbox, Looper, Metrics, MetricsSnapshot};
use tracing::{debug, info, warn};

use crate::clusters::cache::MarkerCaches;
use crate::clusters::config::RendererConfig;
use crate::clusters::dispatch::{Dispatcher, PassReport};
use crate::clusters::error::RenderError;
use crate::clusters::foreground::{ForegroundParts, ForegroundState};
use crate::clusters::item::{Cluster, ClusterItem, ClusterSet};
use crate::clusters::map::MapView;
use crate::clusters::modifier::MarkerModifier;
use crate::clusters::render_pass::RenderWorker;
use crate::clusters::style::{ClusterStyle, DefaultStyle};
use crate::layer::{Layer, LayerId};

/// Shows clustering results on a map as item and cluster markers.
///
/// Owns two named threads: a foreground looper that holds the map and applies
/// marker operations, and a background looper that plans render passes.
/// Results handed to [`on_clusters_changed`](Self::on_clusters_changed) are
/// coalesced; only the newest pending one is rendered.
pub struct ClusterRenderer<T: ClusterItem, M: MapView> {
    id: LayerId,
    foreground: Option<Looper<ForegroundState<T, M>>>,
    background: Option<Looper<RenderWorker<T>>>,
    modifier: Arc<MarkerModifier<T>>,
    dispatcher: Arc<Dispatcher<T>>,
    caches: Arc<RwLock<MarkerCaches<T>>>,
    config: Arc<RwLock<RendererConfig>>,
    metrics: Arc<Mutex<Metrics>>,
}

impl<T: ClusterItem, M: MapView> ClusterRenderer<T, M> {
    pub fn new(id: u64, map: M, config: RendererConfig) -> Result<Self, RenderError> {
        Self::with_style(id, map, config, Arc::new(DefaultStyle))
    }

    /// Like [`new`](Self::new), with icons and render callbacks taken from `style`.
    pub fn with_style(
        id: u64,
        map: M,
        config: RendererConfig,
        style: Arc<dyn ClusterStyle<T>>,
    ) -> Result<Self, RenderError> {
        let fallback = config.pump_fallback();
        let inbox: Inbox<ForegroundState<T, M>> = Inbox::new();
        let modifier = Arc::new(MarkerModifier::new(
            inbox.handle().waker(),
            config.batch_size,
            fallback,
        ));
        let dispatcher = Arc::new(Dispatcher::new());
        let caches = Arc::new(RwLock::new(MarkerCaches::default()));
        let config = Arc::new(RwLock::new(config));
        let metrics = Arc::new(Mutex::new(Metrics::new()));

        let background = Looper::spawn(
            format!("cluster-render-{id}"),
            fallback,
            RenderWorker::new(Arc::clone(&metrics), Arc::clone(&style)),
        )
        .map_err(|e| RenderError::Spawn(e.to_string()))?;

        let parts = ForegroundParts {
            caches: Arc::clone(&caches),
            modifier: Arc::clone(&modifier),
            dispatcher: Arc::clone(&dispatcher),
            config: Arc::clone(&config),
            metrics: Arc::clone(&metrics),
            style,
        };
        let state = ForegroundState::new(
            map,
            parts,
            background.handle().clone(),
            inbox.handle().clone(),
        );
        let foreground = Looper::start(format!("cluster-foreground-{id}"), fallback, inbox, state)
            .map_err(|e| RenderError::Spawn(e.to_string()))?;

        info!("cluster renderer {id} started");
        Ok(Self {
            id: LayerId(id),
            foreground: Some(foreground),
            background: Some(background),
            modifier,
            dispatcher,
            caches,
            config,
            metrics,
        })
    }

    /// Schedules `clusters` for rendering and returns its generation number.
    ///
    /// Never blocks; may be called from any thread.
    pub fn on_clusters_changed(&self, clusters: ClusterSet<T>) -> u64 {
        let generation = self.dispatcher.queue(clusters);
        let Some(foreground) = &self.foreground else {
            return generation;
        };
        if foreground
            .handle()
            .post(|state: &mut ForegroundState<T, M>| state.dispatch_next())
            .is_err()
        {
            warn!("foreground looper stopped, cluster result {generation} will not render");
        }
        generation
    }

    /// Applies from the next render pass on.
    pub fn set_min_cluster_size(&self, min_cluster_size: usize) {
        self.config.write().min_cluster_size = min_cluster_size;
    }

    pub fn set_animation(&self, animate: bool) {
        self.config.write().animate = animate;
    }

    pub fn config(&self) -> RendererConfig {
        self.config.read().clone()
    }

    pub fn marker_for_item(&self, item: &T) -> Option<MarkerId> {
        self.caches.read().items.get(item)
    }

    pub fn item_for_marker(&self, marker: MarkerId) -> Option<T> {
        self.caches.read().items.key_for(marker).cloned()
    }

    pub fn marker_for_cluster(&self, cluster: &Cluster<T>) -> Option<MarkerId> {
        self.caches.read().clusters.get(cluster)
    }

    pub fn cluster_for_marker(&self, marker: MarkerId) -> Option<Arc<Cluster<T>>> {
        self.caches.read().clusters.key_for(marker).cloned()
    }

    /// Receives a [`PassReport`] for every render pass that completes from now on.
    pub fn subscribe(&self) -> Receiver<PassReport> {
        self.dispatcher.subscribe()
    }

    /// Blocks until no pass is queued or running and no marker is animating.
    ///
    /// Returns `false` if that did not happen within `timeout`.
    pub fn wait_until_settled(&self, timeout: Duration) -> bool {
        self.dispatcher.wait_until_settled(timeout)
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.lock().snapshot()
    }

    /// Stops both loopers and hands back the map widget.
    ///
    /// A pass blocked on the marker queue is interrupted, and markers already
    /// on the map stay where they are.
    pub fn shutdown(mut self) -> Option<M> {
        self.stop().map(ForegroundState::into_map)
    }

    fn stop(&mut self) -> Option<ForegroundState<T, M>> {
        let dropped = self.modifier.close();
        if dropped > 0 {
            debug!("dropped {dropped} queued marker operations on shutdown");
        }
        if let Some(background) = self.background.take() {
            background.shutdown();
        }
        let state = self.foreground.take()?.shutdown();
        info!("cluster renderer {} stopped", self.id.0);
        state
    }
}

impl<T: ClusterItem, M: MapView> Layer for ClusterRenderer<T, M> {
    fn id(&self) -> LayerId {
        self.id
    }
}

impl<T: ClusterItem, M: MapView> Drop for ClusterRenderer<T, M> {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
