//! Maps `Box<dyn Error>` from trait boundaries to typed `PanelError`.
//!
//! The traits in `pidpanel_traits` use `Box<dyn Error + Send + Sync>` for maximum
//! flexibility; this module converts those to our typed error enum, with an
//! optional feature-gated path for `pidpanel_hardware::HwError` downcasting.

use crate::error::PanelError;

/// Map a trait-boundary error to a typed `PanelError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> PanelError {
    // Feature-gated: try to downcast to HwError for precise mapping
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<pidpanel_hardware::HwError>() {
            return match hw {
                pidpanel_hardware::HwError::Timeout => PanelError::Timeout,
                pidpanel_hardware::HwError::Io(io)
                    if io.kind() == std::io::ErrorKind::TimedOut =>
                {
                    PanelError::Timeout
                }
                other => PanelError::Transport(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timed out") || s.to_lowercase().contains("timeout") {
        PanelError::Timeout
    } else {
        PanelError::Transport(s)
    }
}

/// Map a failure to open an endpoint. Everything becomes a `Connection` error.
pub fn map_open_error(port: &str, e: &(dyn std::error::Error + 'static)) -> PanelError {
    PanelError::Connection(format!("{port}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Plain(&'static str);
    impl std::fmt::Display for Plain {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }
    impl std::error::Error for Plain {}

    #[test]
    fn string_fallback_detects_timeouts() {
        assert_eq!(map_hw_error(&Plain("read timed out")), PanelError::Timeout);
        assert_eq!(
            map_hw_error(&Plain("device reports fault")),
            PanelError::Transport("device reports fault".into())
        );
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hardware_errors_are_downcast() {
        use pidpanel_hardware::HwError;
        assert_eq!(map_hw_error(&HwError::Timeout), PanelError::Timeout);
        assert!(matches!(
            map_hw_error(&HwError::Disconnected),
            PanelError::Transport(_)
        ));
        let io = HwError::Io(std::io::Error::from(std::io::ErrorKind::TimedOut));
        assert_eq!(map_hw_error(&io), PanelError::Timeout);
    }

    #[test]
    fn open_errors_name_the_port() {
        let err = map_open_error("/dev/ttyACM0", &Plain("permission denied"));
        assert_eq!(
            err,
            PanelError::Connection("/dev/ttyACM0: permission denied".into())
        );
    }
}
