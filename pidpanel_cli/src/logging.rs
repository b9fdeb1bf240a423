//! Tracing subscriber setup: console layer on stderr plus an optional
//! JSON-lines file layer.

use crate::cli::FILE_GUARD;
use pidpanel_config::Logging;
use std::path::Path;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Effective filter directive: `--log-level`, then `[logging].level`, then `info`.
/// `RUST_LOG` overrides all of them.
fn level_directive(flag: Option<&str>, cfg: &Logging) -> String {
    flag.map(str::to_string)
        .or_else(|| cfg.level.clone())
        .unwrap_or_else(|| "info".to_string())
}

pub fn init(json: bool, flag_level: Option<&str>, cfg: &Logging) -> eyre::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level_directive(flag_level, cfg))?,
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if json {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .boxed(),
        );
    }

    if let Some(file) = &cfg.file {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
        let appender = match cfg.rotation.as_deref().unwrap_or("never") {
            "daily" => tracing_appender::rolling::daily(dir, name),
            "hourly" => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_beats_config_level() {
        let cfg = Logging {
            level: Some("debug".into()),
            ..Logging::default()
        };
        assert_eq!(level_directive(Some("warn"), &cfg), "warn");
        assert_eq!(level_directive(None, &cfg), "debug");
        assert_eq!(level_directive(None, &Logging::default()), "info");
    }
}
