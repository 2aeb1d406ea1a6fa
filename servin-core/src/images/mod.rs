//! Image Store & Buildfile Interpreter (§4.4).

mod archive;
mod defaults;
mod record;
mod store;

pub use archive::extract_layer_tarball_streaming;
pub use defaults::ImageDefaults;
pub use record::{ImageRecord, Layer, NONE_TAG};
pub use store::ImageStore;
