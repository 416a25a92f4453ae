mod event;
mod payload;
mod sync;

pub use event::*;
pub use payload::*;
pub use sync::*;
