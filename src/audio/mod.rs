pub mod capture;
pub mod codec;
pub mod framer;
pub mod meter;
pub mod playback;
