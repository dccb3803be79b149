pub mod bar;
pub mod frame;
pub mod signals;

pub use bar::*;
pub use frame::*;
pub use signals::*;
