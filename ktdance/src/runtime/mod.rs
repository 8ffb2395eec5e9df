mod animation;
mod pose;
mod skeleton;

pub use animation::*;
pub use pose::*;
pub use skeleton::*;
