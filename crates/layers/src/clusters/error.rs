/// Why a render pass stopped before reconciling the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The marker queue was closed (layer shutting down) while waiting on it.
    Interrupted,
    /// Waiting for the marker queue from the foreground looper would deadlock.
    DrainOnForeground,
    /// The foreground looper stopped, nothing will apply the queued operations.
    ForegroundClosed,
    /// A looper thread could not be started.
    Spawn(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Interrupted => write!(f, "render pass interrupted"),
            RenderError::DrainOnForeground => {
                write!(f, "cannot wait for marker operations on the foreground looper")
            }
            RenderError::ForegroundClosed => write!(f, "foreground looper is gone"),
            RenderError::Spawn(msg) => write!(f, "failed to start looper: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {}
