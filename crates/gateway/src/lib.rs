mod envelope;
pub mod routes;
mod startup;
mod utils;

pub use envelope::*;
pub use routes::*;
pub use startup::*;
pub use utils::*;
