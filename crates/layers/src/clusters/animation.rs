//! Marker movement between two positions.

use std::time::{Duration, Instant};

use foundation::{LatLng, MarkerId};

use crate::clusters::cache::MarkerWithPosition;

/// Position at `fraction` of the way from `from` to `to`.
///
/// Latitude is linear. Longitude takes the short way around, so the result
/// can leave `[-180, 180]` when the path crosses the antimeridian.
pub fn interpolate(from: LatLng, to: LatLng, fraction: f64) -> LatLng {
    let lat = (to.lat - from.lat) * fraction + from.lat;
    let mut lng_delta = to.lng - from.lng;
    if lng_delta.abs() > 180.0 {
        lng_delta -= lng_delta.signum() * 360.0;
    }
    let lng = lng_delta * fraction + from.lng;
    LatLng::new(lat, lng)
}

/// Fast start, gentle stop.
pub fn decelerate(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AnimationTask {
    pub marker: MarkerWithPosition,
    pub from: LatLng,
    pub to: LatLng,
    /// Destroy the marker once it arrives.
    pub remove_on_complete: bool,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AnimationStep {
    pub marker: MarkerId,
    pub position: LatLng,
    pub finished: bool,
    pub remove: bool,
}

#[derive(Debug)]
struct Running {
    task: AnimationTask,
    started: Instant,
    duration: Duration,
}

/// Animations in flight, advanced by the foreground idle hook.
#[derive(Debug, Default)]
pub struct Animator {
    running: Vec<Running>,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `task`, replacing any animation already moving the same marker.
    pub fn start(&mut self, task: AnimationTask, now: Instant, duration: Duration) {
        self.cancel(task.marker.marker);
        self.running.push(Running {
            task,
            started: now,
            duration,
        });
    }

    pub fn cancel(&mut self, marker: MarkerId) -> bool {
        let before = self.running.len();
        self.running.retain(|r| r.task.marker.marker != marker);
        self.running.len() != before
    }

    pub fn is_animating(&self, marker: MarkerId) -> bool {
        self.running.iter().any(|r| r.task.marker.marker == marker)
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Advances every animation to `now`; finished ones are dropped.
    ///
    /// A finished step lands exactly on the target position.
    pub fn tick(&mut self, now: Instant) -> Vec<AnimationStep> {
        let mut steps = Vec::with_capacity(self.running.len());
        self.running.retain(|r| {
            let elapsed = now.saturating_duration_since(r.started);
            let fraction = if r.duration.is_zero() {
                1.0
            } else {
                (elapsed.as_secs_f64() / r.duration.as_secs_f64()).min(1.0)
            };
            let finished = fraction >= 1.0;
            let position = if finished {
                r.task.to
            } else {
                interpolate(r.task.from, r.task.to, decelerate(fraction))
            };
            steps.push(AnimationStep {
                marker: r.task.marker.marker,
                position,
                finished,
                remove: finished && r.task.remove_on_complete,
            });
            !finished
        });
        steps
    }
}
