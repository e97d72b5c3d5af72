//! Cluster marker layer.
//!
//! Reconciles successive clustering results against the markers shown on a
//! map. Clustering results arrive on any thread and are coalesced so only the
//! newest one is rendered. Each render pass is planned on a background looper
//! and the resulting marker operations are applied on the foreground looper
//! (the only thread allowed to touch the map) in small prioritized batches.

pub mod animation;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod icons;
pub mod item;
pub mod map;
pub mod modifier;
pub mod nearest;
pub mod style;

mod foreground;
mod render_pass;
mod renderer;

#[cfg(test)]
pub(crate) mod testing;

pub use animation::{AnimationTask, decelerate, interpolate};
pub use cache::{MarkerCache, MarkerWithPosition};
pub use config::RendererConfig;
pub use dispatch::{PassOutcome, PassReport};
pub use error::RenderError;
pub use icons::{ClusterIcon, bucket, cluster_color, cluster_text};
pub use item::{Cluster, ClusterAlgorithm, ClusterItem, ClusterSet};
pub use map::{MapError, MapView, MarkerKind, MarkerOptions};
pub use nearest::nearest_within;
pub use renderer::ClusterRenderer;
pub use style::{ClusterStyle, DefaultStyle};
