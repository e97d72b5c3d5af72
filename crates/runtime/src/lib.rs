pub mod budget;
pub mod looper;
pub mod metrics;
pub mod work_queue;

pub use budget::*;
pub use looper::*;
pub use metrics::*;
pub use work_queue::*;
