//! Captured photos and the per-session store that collects them.

pub mod data_url;
pub mod photo;
pub mod store;
pub mod view;

pub use data_url::DataUrl;
pub use photo::{CapturedImage, MAX_IMAGE_BYTES};
pub use store::{CaptureStore, SessionImageSet};
pub use view::View;
