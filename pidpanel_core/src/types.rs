use crate::codec::Direction;

/// Last tuning and motion values sent to the controller.
///
/// Starts at all-zero gains, zero target and clockwise, matching a freshly
/// powered device.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerSetpoint {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub target_rpm: f64,
    pub direction: Direction,
}
