//! Technical indicator implementations.

pub mod bollinger;
pub mod demark;
pub mod kdj;
pub mod moving_average;
pub mod psar;
pub mod rsi;

pub use bollinger::BollingerBands;
pub use demark::DemarkCounter;
pub use kdj::Kdj;
pub use moving_average::{sma, MovingAverages};
pub use psar::ParabolicSar;
pub use rsi::Rsi;
