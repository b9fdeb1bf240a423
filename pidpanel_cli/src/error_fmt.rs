//! Human-readable error descriptions and structured JSON error formatting.

use pidpanel_core::error::{BuildError, PanelError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingOpener => {
                "What happened: No serial backend was provided to the session.\nLikely causes: The session builder was not given an opener.\nHow to fix: Pass a serial or simulated opener via with_opener(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<PanelError>() {
        return match pe {
            PanelError::Connection(detail) => format!(
                "What happened: Could not open the serial port ({detail}).\nLikely causes: Wrong port name, board unplugged, port in use by another program, or missing permissions (dialout group).\nHow to fix: Run `pidpanel ports` to list ports, close other serial monitors, then retry with --port."
            ),
            PanelError::NotConnected => {
                "What happened: The motor controller is not connected.\nLikely causes: No successful connect before start, or the link dropped.\nHow to fix: Connect to a port first (`connect PORT` in the console, or --port/--sim for run).".to_string()
            }
            PanelError::Timeout => {
                "What happened: Timed out waiting for the motor controller.\nLikely causes: Wrong baud rate, firmware not streaming, or read timeout too low.\nHow to fix: Check serial.baud (9600 for the stock firmware) and raise serial.read_timeout_ms.".to_string()
            }
            PanelError::Transport(detail) => format!(
                "What happened: The serial link failed ({detail}).\nLikely causes: Cable unplugged or the board reset.\nHow to fix: Reconnect the board and connect again."
            ),
            PanelError::State(detail) => format!(
                "What happened: Invalid operation for the current state ({detail}).\nLikely causes: Commands issued out of order.\nHow to fix: Check `status` and retry."
            ),
            PanelError::Config(detail) => format!(
                "What happened: Configuration problem ({detail}).\nLikely causes: Missing or out-of-range values.\nHow to fix: Edit the config file or pass the value on the command line."
            ),
        };
    }

    if err
        .chain()
        .any(|c| c.downcast_ref::<toml::de::Error>().is_some())
    {
        return format!(
            "What happened: The config file is not valid TOML.\nLikely causes: A typo, a wrong value type, or an unquoted string.\nHow to fix: Fix the file and rerun. Parser said: {}",
            err.root_cause()
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong path or missing permissions.\nHow to fix: Check the --config path. Original: {msg}"
        );
    }

    if lower.contains("must be") || lower.contains("unreasonably large") {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 connection, 4 not connected, 5 link failure, 6 config, else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(pe) = err.downcast_ref::<PanelError>() {
        return match pe {
            PanelError::Connection(_) => 3,
            PanelError::NotConnected => 4,
            PanelError::Timeout | PanelError::Transport(_) => 5,
            PanelError::Config(_) => 6,
            PanelError::State(_) => 1,
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return 6;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<PanelError>() {
        Some(PanelError::Connection(_)) => "Connection",
        Some(PanelError::NotConnected) => "NotConnected",
        Some(PanelError::Timeout) => "Timeout",
        Some(PanelError::Transport(_)) => "Transport",
        Some(PanelError::State(_)) => "State",
        Some(PanelError::Config(_)) => "Config",
        None if err.downcast_ref::<BuildError>().is_some() => "Config",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "type": "error",
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
