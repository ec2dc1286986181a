//! Raw trainer model formats.

pub mod maxent;
pub mod svmlight;

pub use maxent::GisModel;
pub use svmlight::{Kernel, SvmLightModel};
