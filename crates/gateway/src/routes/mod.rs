pub mod air_quality;
pub mod climate;
pub mod health;

pub use air_quality::*;
pub use climate::*;
pub use health::*;
