pub mod fixed_step;
pub mod frame;
pub mod metrics;

pub use fixed_step::*;
pub use frame::*;
pub use metrics::*;
