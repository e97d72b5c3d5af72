//! One reconciliation of a clustering result against the displayed markers.
//!
//! Runs on the background looper. All map changes go through the
//! [`MarkerModifier`]; the pass blocks on it twice, once after queueing the
//! creates and once after queueing the removals.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use foundation::math::{Projection, SphericalMercator, Vec2};
use foundation::{LatLng, LatLngBounds};
use parking_lot::Mutex;
use runtime::{LooperState, Metrics};
use tracing::{debug, error, warn};

use crate::clusters::cache::MarkerWithPosition;
use crate::clusters::config::RendererConfig;
use crate::clusters::dispatch::{PassOutcome, PassReport, PendingRender};
use crate::clusters::error::RenderError;
use crate::clusters::item::{Cluster, ClusterItem, ClusterSet};
use crate::clusters::map::MapError;
use crate::clusters::modifier::{CreateMarkerTask, CreatedMarkers, MarkerModifier};
use crate::clusters::nearest::nearest_within;
use crate::clusters::style::ClusterStyle;

/// What the previous completed pass left on the map.
#[derive(Debug)]
pub(crate) struct RenderState<T> {
    pub markers: HashSet<MarkerWithPosition>,
    pub clusters: Option<ClusterSet<T>>,
    pub zoom: f64,
}

impl<T> Default for RenderState<T> {
    fn default() -> Self {
        Self {
            markers: HashSet::new(),
            clusters: None,
            zoom: 0.0,
        }
    }
}

/// Camera as read on the foreground when the pass was dispatched.
#[derive(Debug, Clone)]
pub(crate) struct Viewport {
    pub zoom: f64,
    pub bounds: Result<LatLngBounds, MapError>,
}

pub(crate) struct RenderPass<T> {
    pub pending: PendingRender<T>,
    pub viewport: Viewport,
    pub config: RendererConfig,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct CreatePlan {
    pub on_screen: bool,
    pub animate_from: Option<LatLng>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum Removal {
    /// Slide into the new cluster at this position, then disappear.
    AnimateTo(LatLng),
    Remove { on_screen: bool },
}

/// Decisions for one pass, independent of any marker state.
pub(crate) struct PassPlanner<'a, P, T: ClusterItem> {
    zooming_in: bool,
    zoom_delta: f64,
    bounds: LatLngBounds,
    projection: &'a P,
    config: &'a RendererConfig,
    style: &'a dyn ClusterStyle<T>,
}

impl<'a, P: Projection, T: ClusterItem> PassPlanner<'a, P, T> {
    pub fn new(
        zoom: f64,
        previous_zoom: f64,
        bounds: LatLngBounds,
        projection: &'a P,
        config: &'a RendererConfig,
        style: &'a dyn ClusterStyle<T>,
    ) -> Self {
        Self {
            zooming_in: zoom > previous_zoom,
            zoom_delta: zoom - previous_zoom,
            bounds,
            projection,
            config,
            style,
        }
    }

    pub fn as_cluster(&self, cluster: &Cluster<T>) -> bool {
        self.style.render_as_cluster(cluster, self.config)
    }

    /// Screen points of the visible clusters that render as cluster markers.
    pub fn on_screen_points<'c>(
        &self,
        clusters: impl IntoIterator<Item = &'c Arc<Cluster<T>>>,
    ) -> Vec<Vec2> {
        clusters
            .into_iter()
            .filter(|c| self.as_cluster(c) && self.bounds.contains(c.position()))
            .map(|c| self.projection.to_point(c.position()))
            .collect()
    }

    pub fn plan_create(&self, cluster: &Cluster<T>, previous: &[Vec2]) -> CreatePlan {
        let on_screen = self.bounds.contains(cluster.position());
        if self.zooming_in && on_screen && self.config.animate {
            let point = self.projection.to_point(cluster.position());
            let animate_from = nearest_within(previous, point, self.config.max_match_distance_px)
                .map(|p| self.projection.to_lat_lng(p));
            CreatePlan {
                on_screen: true,
                animate_from,
            }
        } else {
            CreatePlan {
                on_screen,
                animate_from: None,
            }
        }
    }

    pub fn plan_removal(&self, position: LatLng, current: &[Vec2]) -> Removal {
        let on_screen = self.bounds.contains(position);
        if !self.zooming_in
            && self.zoom_delta > -self.config.max_animated_zoom_out
            && on_screen
            && self.config.animate
        {
            let point = self.projection.to_point(position);
            match nearest_within(current, point, self.config.max_match_distance_px) {
                Some(target) => Removal::AnimateTo(self.projection.to_lat_lng(target)),
                None => Removal::Remove { on_screen: true },
            }
        } else {
            Removal::Remove { on_screen }
        }
    }
}

/// Background looper state: the render state and nothing else.
pub(crate) struct RenderWorker<T: ClusterItem> {
    state: RenderState<T>,
    metrics: Arc<Mutex<Metrics>>,
    style: Arc<dyn ClusterStyle<T>>,
}

impl<T: ClusterItem> LooperState for RenderWorker<T> {}

impl<T: ClusterItem> RenderWorker<T> {
    pub fn new(metrics: Arc<Mutex<Metrics>>, style: Arc<dyn ClusterStyle<T>>) -> Self {
        Self {
            state: RenderState::default(),
            metrics,
            style,
        }
    }

    pub fn run(&mut self, pass: RenderPass<T>, modifier: &MarkerModifier<T>) -> PassReport {
        let started = Instant::now();
        let generation = pass.pending.generation;
        let zoom = pass.viewport.zoom;
        let clusters = pass.pending.clusters.len();
        debug!("render pass {generation} started: {clusters} clusters at zoom {zoom:.2}");

        let outcome = match self.render(pass, modifier) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("render pass {generation} aborted: {err}");
                PassOutcome::Failed(err.to_string())
            }
        };

        {
            let mut metrics = self.metrics.lock();
            metrics.inc_counter("render.passes", 1);
            match &outcome {
                PassOutcome::Unchanged => metrics.inc_counter("render.unchanged", 1),
                PassOutcome::Failed(_) => metrics.inc_counter("render.failed", 1),
                PassOutcome::Rendered {
                    created,
                    reused,
                    removed,
                    animated,
                } => {
                    metrics.inc_counter("markers.created", *created as u64);
                    metrics.inc_counter("markers.reused", *reused as u64);
                    metrics.inc_counter("markers.removed", *removed as u64);
                    metrics.inc_counter("markers.animated", *animated as u64);
                }
            }
            metrics.record_histogram("render.pass_us", started.elapsed().as_micros() as u64);
        }
        debug!("render pass {generation} finished: {outcome:?}");

        PassReport {
            generation,
            zoom,
            clusters,
            outcome,
        }
    }

    fn render(
        &mut self,
        pass: RenderPass<T>,
        modifier: &MarkerModifier<T>,
    ) -> Result<PassOutcome, RenderError> {
        let RenderPass {
            pending,
            viewport,
            config,
        } = pass;
        let clusters = pending.clusters;

        if self.state.clusters.as_ref() == Some(&clusters) {
            debug!("render pass {} skipped: clusters unchanged", pending.generation);
            return Ok(PassOutcome::Unchanged);
        }

        let zoom = viewport.zoom;
        let previous_zoom = self.state.zoom;
        let projection = SphericalMercator::for_zoom(zoom.min(previous_zoom));
        let bounds = viewport.bounds.unwrap_or_else(|err| {
            warn!("{err}; rendering against empty bounds");
            LatLngBounds::degenerate(LatLng::new(0.0, 0.0))
        });
        let style = Arc::clone(&self.style);
        let planner = PassPlanner::new(
            zoom,
            previous_zoom,
            bounds,
            &projection,
            &config,
            &*style,
        );
        let mut to_remove = self.state.markers.clone();

        let previous = match (&self.state.clusters, config.animate) {
            (Some(previous), true) => planner.on_screen_points(previous.iter()),
            _ => Vec::new(),
        };

        let output = Arc::new(Mutex::new(CreatedMarkers::default()));
        for cluster in clusters.iter() {
            let plan = planner.plan_create(cluster, &previous);
            modifier.add(
                plan.on_screen,
                CreateMarkerTask {
                    cluster: Arc::clone(cluster),
                    animate_from: plan.animate_from,
                    as_cluster: planner.as_cluster(cluster),
                    output: Arc::clone(&output),
                },
            );
        }
        modifier.drain()?;

        let created = std::mem::take(&mut *output.lock());
        for marker in &created.markers {
            to_remove.remove(marker);
        }

        let current = if config.animate {
            planner.on_screen_points(clusters.iter())
        } else {
            Vec::new()
        };
        let mut animated = created.animated;
        for marker in &to_remove {
            match planner.plan_removal(marker.position, &current) {
                Removal::AnimateTo(target) => {
                    modifier.animate_then_remove(*marker, marker.position, target);
                    animated += 1;
                }
                Removal::Remove { on_screen } => modifier.remove(on_screen, marker.marker),
            }
        }
        modifier.drain()?;

        let outcome = PassOutcome::Rendered {
            created: created.created,
            reused: created.reused,
            removed: to_remove.len(),
            animated,
        };
        self.state = RenderState {
            markers: created.markers,
            clusters: Some(clusters),
            zoom,
        };
        Ok(outcome)
    }
}
