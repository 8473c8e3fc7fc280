pub mod decoder;
pub mod filter;
pub mod format;
pub mod scanner;

pub use decoder::{SmoothingWindow, TiltDecoder};
pub use filter::filter;
pub use format::BeaconFormat;
pub use scanner::scan_advertisements;
