mod idr;

pub mod op;
mod secret;

pub use idr::{Idr, IdrConversionError};
pub use secret::Secret;
