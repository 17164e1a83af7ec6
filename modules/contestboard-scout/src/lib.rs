pub mod aggregate;
mod html;
pub mod normalize;
pub mod render;
pub mod snapshot;
pub mod sources;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod transport;
