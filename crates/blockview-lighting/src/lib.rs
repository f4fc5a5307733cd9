//! Light descriptors, the fixed-capacity light pool, and its GPU mirror.

mod light;
mod pool;
mod upload;

pub use light::{Light, LightGpu, LightHeader, LightMode};
pub use pool::{Allocation, LightOwner, LightPool, MAX_LIGHTS};
pub use upload::LightBuffer;
