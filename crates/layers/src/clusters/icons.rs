//! Cluster icon bucketing.
//!
//! Cluster sizes are rounded down to a few display buckets so icons can be
//! shared between clusters of similar size.

use std::collections::HashMap;

use crate::clusters::item::ClusterItem;
use crate::clusters::style::ClusterStyle;

pub const BUCKETS: [usize; 7] = [10, 20, 50, 100, 200, 500, 1000];

/// Display bucket for a cluster of `size` items.
pub fn bucket(size: usize) -> usize {
    if size <= BUCKETS[0] {
        return size;
    }
    for pair in BUCKETS.windows(2) {
        if size < pair[1] {
            return pair[0];
        }
    }
    BUCKETS[BUCKETS.len() - 1]
}

pub fn cluster_text(bucket: usize) -> String {
    if bucket < BUCKETS[0] {
        bucket.to_string()
    } else {
        format!("{bucket}+")
    }
}

/// Colour ramp from blue (small) to red (300 items and up).
pub fn cluster_color(size: usize) -> [u8; 3] {
    let span = 300.0;
    let size = (size as f64).min(span);
    let hue = ((span - size) * (span - size) / (span * span)) * 220.0;
    hsv_to_rgb(hue, 1.0, 0.6)
}

fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> [u8; 3] {
    let c = value * saturation;
    let h = (hue / 60.0).rem_euclid(6.0);
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [channel(r), channel(g), channel(b)]
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterIcon {
    pub bucket: usize,
    pub text: String,
    pub color: [u8; 3],
}

impl ClusterIcon {
    pub fn for_bucket<T: ClusterItem>(bucket: usize, style: &dyn ClusterStyle<T>) -> Self {
        Self {
            bucket,
            text: style.cluster_text(bucket),
            color: style.cluster_color(bucket),
        }
    }
}

/// Icons built so far, one per bucket of the renderer's style.
#[derive(Debug, Default)]
pub struct IconCache {
    icons: HashMap<usize, ClusterIcon>,
}

impl IconCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_size<T: ClusterItem>(
        &mut self,
        size: usize,
        style: &dyn ClusterStyle<T>,
    ) -> &ClusterIcon {
        let bucket = style.bucket(size);
        self.icons
            .entry(bucket)
            .or_insert_with(|| ClusterIcon::for_bucket(bucket, style))
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}
