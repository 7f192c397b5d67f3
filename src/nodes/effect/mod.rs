mod color;
mod passthrough;

pub use color::{ColorComponent, ColorFilter};
pub use passthrough::Passthrough;
