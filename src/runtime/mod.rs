//! Host frame-loop adapters.

pub mod frame_driver;

pub use frame_driver::FrameDriver;
