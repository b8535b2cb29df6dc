//! Register definitions for the RFM22/23 (Si4431/4432) transceiver
//! Only the registers needed for OOK transmission from the FIFO are defined.

mod interrupt;
mod packet;
mod rf;
mod system;

pub use interrupt::*;
pub use packet::*;
pub use rf::*;
pub use system::*;
