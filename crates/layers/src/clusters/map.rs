use foundation::{LatLng, LatLngBounds, MarkerId};

use crate::clusters::icons::ClusterIcon;
use crate::clusters::item::ClusterItem;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Item,
    Cluster,
}

/// Everything the map widget needs to create a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerOptions {
    pub kind: MarkerKind,
    pub position: LatLng,
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub icon: Option<ClusterIcon>,
}

impl MarkerOptions {
    /// Options for an item marker placed at `position`.
    ///
    /// Title and snippet are both shown when the item has both; otherwise the
    /// one that exists becomes the title.
    pub fn for_item<T: ClusterItem>(item: &T, position: LatLng) -> Self {
        let (title, snippet) = match (item.title(), item.snippet()) {
            (Some(title), Some(snippet)) => (Some(title), Some(snippet)),
            (Some(title), None) => (Some(title), None),
            (None, snippet) => (snippet, None),
        };
        Self {
            kind: MarkerKind::Item,
            position,
            title: title.map(str::to_string),
            snippet: snippet.map(str::to_string),
            icon: None,
        }
    }

    pub fn for_cluster(position: LatLng, icon: ClusterIcon) -> Self {
        Self {
            kind: MarkerKind::Cluster,
            position,
            title: None,
            snippet: None,
            icon: Some(icon),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    BoundsUnavailable(String),
}

impl std::fmt::Display for MapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapError::BoundsUnavailable(reason) => {
                write!(f, "visible bounds unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for MapError {}

/// The host map widget.
///
/// Only ever called from the foreground looper, which owns the value.
pub trait MapView: Send + 'static {
    fn zoom(&self) -> f64;
    fn visible_bounds(&self) -> Result<LatLngBounds, MapError>;
    fn add_marker(&mut self, options: &MarkerOptions) -> MarkerId;
    fn remove_marker(&mut self, marker: MarkerId);
    fn set_position(&mut self, marker: MarkerId, position: LatLng);
    fn set_text(&mut self, marker: MarkerId, title: Option<&str>, snippet: Option<&str>);
}

#[cfg(test)]
mod tests {
    use super::{MarkerKind, MarkerOptions};
    use crate::clusters::testing::Poi;
    use foundation::LatLng;

    #[test]
    fn item_text_falls_back_to_snippet_as_title() {
        let at = LatLng::new(0.0, 0.0);
        let mut poi = Poi::new(1, 0.0, 0.0);
        let bare = MarkerOptions::for_item(&poi, at);
        assert_eq!((bare.title, bare.snippet), (None, None));
        assert_eq!(bare.kind, MarkerKind::Item);

        poi.snippet = Some("open late".into());
        let snippet_only = MarkerOptions::for_item(&poi, at);
        assert_eq!(snippet_only.title.as_deref(), Some("open late"));
        assert_eq!(snippet_only.snippet, None);

        let both = MarkerOptions::for_item(&poi.clone().titled("Cafe"), at);
        assert_eq!(both.title.as_deref(), Some("Cafe"));
        assert_eq!(both.snippet.as_deref(), Some("open late"));
    }
}
