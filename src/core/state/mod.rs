// Watermark persistence

pub mod record;
pub mod store;

pub use record::{Alignment, Record};
pub use store::WatermarkStore;
