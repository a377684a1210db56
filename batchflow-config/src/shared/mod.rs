mod base;
mod batch;
mod pipeline;
mod retry;

pub use base::*;
pub use batch::*;
pub use pipeline::*;
pub use retry::*;
