#![forbid(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod media_type;

pub use errors::{CoreError, CoreResult};
pub use ids::IdGenerator;
pub use media_type::MediaType;
