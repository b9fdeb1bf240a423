#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_panics_doc
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Real-time telemetry pipeline of the motor control panel (hardware-agnostic).
//!
//! All serial I/O goes through `pidpanel_traits::LinkOpener` and
//! `pidpanel_traits::LineLink`; the concrete backends live in
//! `pidpanel_hardware`.
//!
//! ## Architecture
//!
//! - **Transport**: owns the open link, bounded reads, serialized writes (`transport`)
//! - **Codec**: outbound command encoding and inbound line decoding (`codec`)
//! - **Buffer**: append-only, resettable sample history (`buffer`)
//! - **Acquisition**: one background reader per run, cancellable (`acquisition`)
//! - **Metrics**: step-response statistics over a snapshot (`metrics`)
//! - **Refresh**: fixed-period snapshot and render cycle (`refresh`)
//! - **Session**: the command-dispatch surface tying them together (`session`)
//!
//! ## Threads
//!
//! Blocking reads happen only on the acquisition thread and are bounded by the
//! read timeout, so stop and disconnect complete within one timeout.

pub mod acquisition;
pub mod buffer;
pub mod builder;
pub mod codec;
pub mod config;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod metrics;
pub mod mocks;
pub mod refresh;
pub mod session;
pub mod status;
pub mod transport;
pub mod types;
pub mod util;

pub use acquisition::{Acquisition, DirectionCell};
pub use buffer::{Sample, SampleBuffer};
pub use builder::PanelSessionBuilder;
pub use codec::{Command, DecodeError, Direction, Telemetry, decode_line};
pub use config::SessionCfg;
pub use error::{BuildError, PanelError, Report, Result};
pub use metrics::Metrics;
pub use refresh::{
    Frame, FrameSource, MetricLabels, MetricsDisplay, PlotFrame, PlotRenderer, RefreshScheduler,
};
pub use session::PanelSession;
pub use status::{ConnectionState, MotorRunState};
pub use transport::{ReadOutcome, ReaderGuard, Transport};
pub use types::ControllerSetpoint;
