use std::env;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use foundation::LatLng;
use layers::clusters::{
    ClusterAlgorithm, ClusterItem, ClusterRenderer, PassOutcome, PassReport, RendererConfig,
};
use serde_json::{Value, json};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod grid;
mod log_map;

use grid::GridAlgorithm;
use log_map::{Camera, LogMap};

#[derive(Parser, Debug)]
#[command(author, version, about = "Drives the cluster renderer through a scripted zoom sequence")]
struct Args {
    /// JSON renderer config; missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of generated places
    #[arg(long, default_value_t = 500)]
    places: u32,

    /// Zoom levels to visit, in order
    #[arg(long, value_delimiter = ',', default_value = "3,5,8,11,9,4")]
    zooms: Vec<f64>,

    /// Grid cell size in pixels
    #[arg(long, default_value_t = 100)]
    cell_px: u32,

    #[arg(long)]
    min_cluster_size: Option<usize>,

    #[arg(long)]
    no_animation: bool,

    /// Seed for the generated places
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Seconds to wait for each step to settle
    #[arg(long, default_value_t = 10)]
    settle_secs: u64,
}

/// A named point of interest.
#[derive(Debug, Clone)]
pub struct Place {
    id: u32,
    position: LatLng,
    name: String,
}

impl Place {
    pub fn new(id: u32, lat: f64, lng: f64) -> Self {
        Self {
            id,
            position: LatLng::new(lat, lng),
            name: format!("place {id}"),
        }
    }
}

impl PartialEq for Place {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Place {}

impl Hash for Place {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl ClusterItem for Place {
    fn position(&self) -> LatLng {
        self.position
    }

    fn title(&self) -> Option<&str> {
        Some(&self.name)
    }
}

const HUBS: [(f64, f64); 4] = [
    (48.8566, 2.3522),
    (21.0285, 105.8542),
    (-33.8688, 151.2093),
    (40.7128, -74.0060),
];

/// Deterministic places scattered around a few cities.
fn generate_places(count: u32, seed: u64) -> Vec<Place> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 11) as f64) / ((1u64 << 53) as f64)
    };
    (0..count)
        .map(|id| {
            let (lat, lng) = HUBS[id as usize % HUBS.len()];
            let spread = 0.5 * next();
            let angle = std::f64::consts::TAU * next();
            Place::new(id, lat + spread * angle.sin(), lng + spread * angle.cos())
        })
        .collect()
}

fn main() {
    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let grid = GridAlgorithm::new(generate_places(args.places, args.seed), args.cell_px);
    let config = load_config(args.config.as_deref(), &grid)?;
    let config = apply_env(config);
    let config = RendererConfig {
        min_cluster_size: args.min_cluster_size.unwrap_or(config.min_cluster_size),
        animate: config.animate && !args.no_animation,
        ..config
    };
    info!("rendering {} places with {config:?}", grid.len());

    let (hub_lat, hub_lng) = HUBS[0];
    let camera = |zoom: f64| Camera {
        zoom,
        centre: LatLng::new(hub_lat, hub_lng),
        span_deg: 360.0,
    };
    let first_zoom = args.zooms.first().copied().unwrap_or(0.0);
    let map = LogMap::new(camera(first_zoom));
    let renderer = ClusterRenderer::new(1, map.clone(), config)?;
    let reports = renderer.subscribe();
    let settle = Duration::from_secs(args.settle_secs);

    let mut steps = Vec::new();
    for &zoom in &args.zooms {
        map.move_camera(camera(zoom));
        let clusters = grid.clusters(zoom);
        let generation = renderer.on_clusters_changed(clusters);
        if !renderer.wait_until_settled(settle) {
            warn!("zoom {zoom}: renderer did not settle within {settle:?}");
        }
        let passes: Vec<Value> = reports.try_iter().map(|r| report_json(&r)).collect();
        let calls = map.calls();
        info!(
            "zoom {zoom}: {} item markers, {} cluster markers",
            calls.live_items, calls.live_clusters
        );
        steps.push(json!({
            "zoom": zoom,
            "generation": generation,
            "passes": passes,
            "map": calls,
        }));
    }

    let metrics = renderer.metrics_snapshot();
    let counters: serde_json::Map<String, Value> = metrics
        .counters
        .iter()
        .map(|(name, value)| (name.to_string(), json!(value)))
        .collect();
    let histograms: serde_json::Map<String, Value> = metrics
        .histograms
        .iter()
        .map(|(name, h)| {
            (
                name.to_string(),
                json!({ "count": h.count, "min": h.min, "max": h.max, "mean": h.mean() }),
            )
        })
        .collect();
    renderer.shutdown();

    let summary = json!({
        "places": grid.len(),
        "steps": steps,
        "counters": counters,
        "histograms": histograms,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn report_json(report: &PassReport) -> Value {
    let outcome = match &report.outcome {
        PassOutcome::Unchanged => json!("unchanged"),
        PassOutcome::Rendered {
            created,
            reused,
            removed,
            animated,
        } => json!({
            "created": created,
            "reused": reused,
            "removed": removed,
            "animated": animated,
        }),
        PassOutcome::Failed(reason) => json!({ "failed": reason }),
    };
    json!({
        "generation": report.generation,
        "zoom": report.zoom,
        "clusters": report.clusters,
        "outcome": outcome,
    })
}

fn load_config<A: ClusterAlgorithm<Place>>(
    path: Option<&Path>,
    algorithm: &A,
) -> Result<RendererConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("read {}: {e}", path.display()))?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(RendererConfig::from_algorithm(algorithm)),
    }
}

fn apply_env(config: RendererConfig) -> RendererConfig {
    RendererConfig {
        min_cluster_size: env_var_usize("CLUSTER_MIN_SIZE", config.min_cluster_size),
        animate: env_var_bool("CLUSTER_ANIMATE", config.animate),
        max_match_distance_px: env_var_f64("CLUSTER_MATCH_PX", config.max_match_distance_px),
        batch_size: env_var_u32("CLUSTER_BATCH_SIZE", config.batch_size),
        max_animated_zoom_out: env_var_f64("CLUSTER_MAX_ZOOM_OUT", config.max_animated_zoom_out),
        pump_fallback_ms: env_var_u64("CLUSTER_PUMP_MS", config.pump_fallback_ms),
        animation_duration_ms: env_var_u64("CLUSTER_ANIMATION_MS", config.animation_duration_ms),
    }
}

fn env_var_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_bool(key: &str, default: bool) -> bool {
    match env::var(key).ok().as_deref() {
        Some("1" | "true" | "yes") => true,
        Some("0" | "false" | "no") => false,
        _ => default,
    }
}
