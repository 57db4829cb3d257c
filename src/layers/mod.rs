pub mod linear;
pub mod dense;
pub mod conv;
pub mod conv_transpose;
pub mod branch;
pub mod layer;

pub use branch::Branch;
pub use conv::{Conv2d, Padding};
pub use conv_transpose::ConvTranspose2d;
pub use dense::Dense;
pub use layer::Layer;
pub use linear::LinearLayer;
