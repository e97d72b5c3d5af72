//! State owned by the foreground looper: the map widget and everything that
//! mirrors it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use foundation::{LatLng, MarkerId};
use parking_lot::{Mutex, RwLock};
use runtime::{IdleStatus, LooperHandle, LooperState, Metrics};
use tracing::{debug, error};

use crate::clusters::animation::{AnimationTask, Animator};
use crate::clusters::cache::{MarkerCaches, MarkerWithPosition};
use crate::clusters::config::RendererConfig;
use crate::clusters::dispatch::{Dispatcher, PassReport};
use crate::clusters::icons::IconCache;
use crate::clusters::item::{Cluster, ClusterItem};
use crate::clusters::map::{MapView, MarkerKind, MarkerOptions};
use crate::clusters::modifier::{CreateMarkerTask, MarkerModifier, MarkerOps};
use crate::clusters::render_pass::{RenderPass, RenderWorker, Viewport};
use crate::clusters::style::ClusterStyle;

/// What the map currently shows for one marker.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DisplayedMarker {
    pub kind: MarkerKind,
    pub position: LatLng,
    pub title: Option<String>,
    pub snippet: Option<String>,
}

impl DisplayedMarker {
    fn from_options(options: &MarkerOptions) -> Self {
        Self {
            kind: options.kind,
            position: options.position,
            title: options.title.clone(),
            snippet: options.snippet.clone(),
        }
    }
}

/// Shared handles the foreground is built from.
pub(crate) struct ForegroundParts<T: ClusterItem> {
    pub caches: Arc<RwLock<MarkerCaches<T>>>,
    pub modifier: Arc<MarkerModifier<T>>,
    pub dispatcher: Arc<Dispatcher<T>>,
    pub config: Arc<RwLock<RendererConfig>>,
    pub metrics: Arc<Mutex<Metrics>>,
    pub style: Arc<dyn ClusterStyle<T>>,
}

pub(crate) struct ForegroundState<T: ClusterItem, M: MapView> {
    map: M,
    live: HashMap<MarkerId, DisplayedMarker>,
    /// Markers sliding towards a cluster before being removed.
    retiring: HashSet<MarkerId>,
    icons: IconCache,
    animator: Animator,
    parts: ForegroundParts<T>,
    background: LooperHandle<RenderWorker<T>>,
    this: LooperHandle<ForegroundState<T, M>>,
}

impl<T: ClusterItem, M: MapView> ForegroundState<T, M> {
    pub fn new(
        map: M,
        parts: ForegroundParts<T>,
        background: LooperHandle<RenderWorker<T>>,
        this: LooperHandle<ForegroundState<T, M>>,
    ) -> Self {
        Self {
            map,
            live: HashMap::new(),
            retiring: HashSet::new(),
            icons: IconCache::new(),
            animator: Animator::new(),
            parts,
            background,
            this,
        }
    }

    pub fn into_map(self) -> M {
        self.map
    }

    /// Starts the queued render pass unless one is already running.
    pub fn dispatch_next(&mut self) {
        if self.parts.modifier.is_closed() {
            return;
        }
        let Some(pending) = self.parts.dispatcher.begin() else {
            return;
        };
        let pass = RenderPass {
            pending,
            viewport: Viewport {
                zoom: self.map.zoom(),
                bounds: self.map.visible_bounds(),
            },
            config: self.parts.config.read().clone(),
        };
        let modifier = Arc::clone(&self.parts.modifier);
        let foreground = self.this.clone();
        let posted = self.background.post(move |worker: &mut RenderWorker<T>| {
            let report = worker.run(pass, &modifier);
            if foreground
                .post(move |state: &mut ForegroundState<T, M>| state.finish_pass(report))
                .is_err()
            {
                debug!("foreground gone, dropping render report");
            }
        });
        if posted.is_err() {
            error!("render looper gone, cannot start render pass");
            self.parts.dispatcher.finish();
        }
    }

    fn finish_pass(&mut self, report: PassReport) {
        self.parts.dispatcher.publish(&report);
        if self.parts.dispatcher.finish() {
            self.dispatch_next();
        }
    }

    fn add_marker(&mut self, options: MarkerOptions) -> MarkerId {
        let marker = self.map.add_marker(&options);
        self.live.insert(marker, DisplayedMarker::from_options(&options));
        marker
    }

    /// Removes `marker` from the map, the caches and any running animation.
    fn destroy(&mut self, marker: MarkerId) {
        self.parts.caches.write().purge(marker);
        self.retiring.remove(&marker);
        self.animator.cancel(marker);
        if let Some(shown) = self.live.remove(&marker) {
            self.map.remove_marker(marker);
            if shown.kind == MarkerKind::Cluster {
                debug!("removed cluster {marker}");
            }
        }
    }

    /// A cached marker that is still usable for a new pass.
    fn reusable(&self, marker: Option<MarkerId>) -> Option<MarkerId> {
        marker.filter(|m| self.live.contains_key(m) && !self.retiring.contains(m))
    }

    fn show_item(
        &mut self,
        item: &T,
        animate_from: Option<LatLng>,
        modifier: &MarkerModifier<T>,
    ) -> (MarkerId, bool) {
        let cached = self.parts.caches.read().items.get(item);
        if let Some(marker) = self.reusable(cached) {
            self.update_item(marker, item);
            self.parts.caches.write().items.put(item.clone(), marker);
            self.parts.style.item_rendered(item, marker);
            return (marker, false);
        }

        let mut options = MarkerOptions::for_item(item, animate_from.unwrap_or(item.position()));
        self.parts.style.before_item_rendered(item, &mut options);
        let marker = self.add_marker(options);
        self.parts.caches.write().items.put(item.clone(), marker);
        if let Some(from) = animate_from {
            modifier.animate(
                MarkerWithPosition::new(marker, item.position()),
                from,
                item.position(),
            );
        }
        self.parts.style.item_rendered(item, marker);
        (marker, true)
    }

    /// Re-applies text and position, but only where they changed.
    fn update_item(&mut self, marker: MarkerId, item: &T) {
        let mut wanted = MarkerOptions::for_item(item, item.position());
        self.parts.style.before_item_rendered(item, &mut wanted);
        let Some(shown) = self.live.get_mut(&marker) else {
            return;
        };
        if shown.title != wanted.title || shown.snippet != wanted.snippet {
            self.map
                .set_text(marker, wanted.title.as_deref(), wanted.snippet.as_deref());
            shown.title = wanted.title;
            shown.snippet = wanted.snippet;
        }
        if shown.position != wanted.position && !self.animator.is_animating(marker) {
            self.map.set_position(marker, wanted.position);
            shown.position = wanted.position;
        }
    }

    fn show_cluster(
        &mut self,
        cluster: &Arc<Cluster<T>>,
        animate_from: Option<LatLng>,
        modifier: &MarkerModifier<T>,
    ) -> (MarkerId, bool) {
        let cached = self.parts.caches.read().clusters.get(cluster.as_ref());
        if let Some(marker) = self.reusable(cached) {
            self.parts.style.cluster_rendered(cluster, marker);
            return (marker, false);
        }

        let style = Arc::clone(&self.parts.style);
        let icon = self.icons.for_size(cluster.size(), &*style).clone();
        let start = animate_from.unwrap_or(cluster.position());
        let mut options = MarkerOptions::for_cluster(start, icon);
        style.before_cluster_rendered(cluster, &mut options);
        let marker = self.add_marker(options);
        debug!("cluster {marker} added, {} icons cached", self.icons.len());
        self.parts
            .caches
            .write()
            .clusters
            .put(Arc::clone(cluster), marker);
        if let Some(from) = animate_from {
            modifier.animate(
                MarkerWithPosition::new(marker, cluster.position()),
                from,
                cluster.position(),
            );
        }
        style.cluster_rendered(cluster, marker);
        (marker, true)
    }

    fn tick_animations(&mut self, now: Instant) {
        if self.animator.is_empty() {
            return;
        }
        for step in self.animator.tick(now) {
            if step.remove {
                self.destroy(step.marker);
                continue;
            }
            if let Some(shown) = self.live.get_mut(&step.marker) {
                self.map.set_position(step.marker, step.position);
                shown.position = step.position;
            }
        }
    }
}

impl<T: ClusterItem, M: MapView> MarkerOps<T> for ForegroundState<T, M> {
    fn create_markers(&mut self, task: CreateMarkerTask<T>, modifier: &MarkerModifier<T>) {
        let mut shown = Vec::new();
        let mut created = 0;
        let mut animated = 0;
        if task.as_cluster {
            let (marker, fresh) = self.show_cluster(&task.cluster, task.animate_from, modifier);
            shown.push(MarkerWithPosition::new(marker, task.cluster.position()));
            if fresh {
                created += 1;
                animated += usize::from(task.animate_from.is_some());
            }
        } else {
            for item in task.cluster.items() {
                let (marker, fresh) = self.show_item(item, task.animate_from, modifier);
                shown.push(MarkerWithPosition::new(marker, item.position()));
                if fresh {
                    created += 1;
                    animated += usize::from(task.animate_from.is_some());
                }
            }
        }

        let mut output = task.output.lock();
        output.reused += shown.len() - created;
        output.created += created;
        output.animated += animated;
        output.markers.extend(shown);
    }

    fn remove_marker(&mut self, marker: MarkerId) {
        self.destroy(marker);
    }

    fn start_animation(&mut self, task: AnimationTask) {
        let marker = task.marker.marker;
        if !self.live.contains_key(&marker) {
            debug!("{marker} is gone, skipping its animation");
            return;
        }
        if task.remove_on_complete {
            self.retiring.insert(marker);
        }
        let duration = self.parts.config.read().animation_duration();
        self.animator.start(task, Instant::now(), duration);
        self.parts.dispatcher.set_animating(true);
    }
}

impl<T: ClusterItem, M: MapView> LooperState for ForegroundState<T, M> {
    fn on_idle(&mut self, now: Instant) -> IdleStatus {
        let modifier = Arc::clone(&self.parts.modifier);
        let pump = modifier.pump(self);
        if pump.performed > 0 {
            self.parts
                .metrics
                .lock()
                .record_histogram("modifier.batch", u64::from(pump.performed));
        }
        self.tick_animations(now);
        self.parts
            .dispatcher
            .set_animating(!self.animator.is_empty());
        if pump.status == IdleStatus::Pending || !self.animator.is_empty() {
            IdleStatus::Pending
        } else {
            IdleStatus::Idle
        }
    }
}
