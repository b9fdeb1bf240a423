//! Serial backends for the motor control panel: a `serialport`-based link for
//! real controllers and a simulated controller for development and tests.
pub mod error;
pub mod framer;
pub mod serial;
pub mod sim;
pub mod util;

pub use error::HwError;
pub use framer::LineFramer;
pub use serial::{SerialLink, SerialOpener, list_ports};
pub use sim::{SIM_PORT, SimGains, SimParams, SimulatedLink, SimulatedOpener};
