pub mod angle;
pub mod ecef;
pub mod geodesy;
pub mod local;
pub mod vec;

pub use angle::*;
pub use ecef::*;
pub use geodesy::*;
pub use local::*;
pub use vec::*;
