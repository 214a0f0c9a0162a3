// Draw archive synchronization and number recommendation
pub mod api;
pub mod archive;
pub mod database;
pub mod errors;
pub mod sampler;
pub mod sync;
pub mod types;
pub mod utils;

pub use api::*;
pub use archive::*;
pub use database::*;
pub use errors::*;
pub use sampler::*;
pub use sync::*;
pub use types::*;
pub use utils::*;
