//! Console implementations of the plot renderer and the metrics display.
//!
//! Text mode prints one line per tick for each collaborator; JSON mode prints
//! one JSON object per line with a `type` field (`plot`, `metrics`, `summary`).

use pidpanel_core::{Frame, MetricLabels, MetricsDisplay, PlotFrame, PlotRenderer};
use serde_json::json;
use std::io::Write;

fn emit<W: Write>(out: &mut W, line: &str) {
    // A closed stdout (e.g. piped into `head`) must not take the refresh thread down.
    if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
        tracing::debug!(error = %e, "console output failed");
    }
}

pub struct ConsolePlot<W> {
    out: W,
    json: bool,
}

impl<W: Write + Send> ConsolePlot<W> {
    pub fn new(out: W, json: bool) -> Self {
        Self { out, json }
    }
}

impl ConsolePlot<std::io::Stdout> {
    pub fn stdout(json: bool) -> Self {
        Self::new(std::io::stdout(), json)
    }
}

pub fn plot_line(plot: &PlotFrame, json: bool) -> String {
    if json {
        return json!({
            "type": "plot",
            "samples": plot.rpm.len(),
            "t": plot.times.last(),
            "rpm": plot.rpm.last(),
            "error": plot.error.last(),
            "annotations": plot.annotations,
        })
        .to_string();
    }
    let tail = match (plot.times.last(), plot.error.last()) {
        (Some(t), Some(e)) => format!("t={t:.2}s err={e:.2}"),
        _ => "no samples".to_string(),
    };
    format!(
        "plot  n={:<5} {tail} | {}",
        plot.rpm.len(),
        plot.annotations.join(" | ")
    )
}

impl<W: Write + Send> PlotRenderer for ConsolePlot<W> {
    fn render_plot(&mut self, plot: &PlotFrame) {
        let line = plot_line(plot, self.json);
        emit(&mut self.out, &line);
    }
}

pub struct ConsoleMetrics<W> {
    out: W,
    json: bool,
}

impl<W: Write + Send> ConsoleMetrics<W> {
    pub fn new(out: W, json: bool) -> Self {
        Self { out, json }
    }
}

impl ConsoleMetrics<std::io::Stdout> {
    pub fn stdout(json: bool) -> Self {
        Self::new(std::io::stdout(), json)
    }
}

pub fn labels_json(l: &MetricLabels) -> serde_json::Value {
    json!({
        "steady_state_error": l.steady_state_error,
        "sampling_time": l.sampling_time,
        "peak_time": l.peak_time,
        "rise_time": l.rise_time,
        "overshoot": l.overshoot,
        "current_rpm": l.current_rpm,
        "direction": l.direction,
        "reported_direction": l.reported_direction,
        "led": l.led,
    })
}

pub fn labels_line(l: &MetricLabels, json: bool) -> String {
    if json {
        let mut v = labels_json(l);
        v["type"] = json!("metrics");
        return v.to_string();
    }
    let mut line = format!(
        "[{}] Ess={} Ts={} Tp={} Tr={} Os={} RPM={} Dir={}",
        l.led,
        l.steady_state_error,
        l.sampling_time,
        l.peak_time,
        l.rise_time,
        l.overshoot,
        l.current_rpm,
        l.direction
    );
    if !l.reported_direction.is_empty() {
        line.push_str(&format!(" Reported={}", l.reported_direction));
    }
    line
}

impl<W: Write + Send> MetricsDisplay for ConsoleMetrics<W> {
    fn show_metrics(&mut self, labels: &MetricLabels) {
        let line = labels_line(labels, self.json);
        emit(&mut self.out, &line);
    }
}

/// Final report printed when a run ends.
pub fn summary(frame: &Frame, port: Option<&str>, json: bool) -> String {
    let labels = frame.labels();
    if json {
        let m = &frame.metrics;
        return json!({
            "type": "summary",
            "port": port,
            "target_rpm": frame.setpoint.target_rpm,
            "kp": frame.setpoint.kp,
            "ki": frame.setpoint.ki,
            "kd": frame.setpoint.kd,
            "direction": frame.setpoint.direction.to_string(),
            "reported_direction": frame.reported_direction.map(|d| d.to_string()),
            "samples": frame.samples.len(),
            "current_rpm": frame.current_rpm(),
            "metrics": {
                "steady_state_error": m.steady_state_error,
                "sampling_time": m.sampling_time,
                "peak_time": m.peak_time,
                "rise_time": m.rise_time,
                "overshoot": m.overshoot,
            },
        })
        .to_string();
    }
    format!(
        "Run finished on {}: {} samples, target {} RPM\n  Steady-state error: {}\n  Sampling time:      {} s\n  Peak time:          {} s\n  Rise time:          {} s\n  Overshoot:          {}\n  Current RPM: {}  Direction: {}",
        port.unwrap_or("-"),
        frame.samples.len(),
        frame.setpoint.target_rpm,
        labels.steady_state_error,
        labels.sampling_time,
        labels.peak_time,
        labels.rise_time,
        labels.overshoot,
        labels.current_rpm,
        labels.direction,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pidpanel_core::{ConnectionState, ControllerSetpoint, MotorRunState, Sample};

    fn frame() -> Frame {
        let samples = [(0.0, 50), (1.0, 90), (2.0, 100)]
            .iter()
            .map(|&(elapsed_s, rpm)| Sample { elapsed_s, rpm })
            .collect();
        Frame::new(
            samples,
            ControllerSetpoint {
                target_rpm: 100.0,
                ..ControllerSetpoint::default()
            },
            ConnectionState::Connected,
            MotorRunState::Running,
            None,
        )
    }

    #[test]
    fn text_lines_carry_annotations_and_labels() {
        let f = frame();
        let plot = plot_line(&f.plot(), false);
        assert!(plot.contains("Current RPM: 100"));
        assert!(plot.contains("Direction: CW"));
        let labels = labels_line(&f.labels(), false);
        assert!(labels.starts_with("[green]"));
        assert!(labels.contains("Tr=1.00"));
        assert!(!labels.contains("Reported="));
    }

    #[test]
    fn json_lines_parse() {
        let f = frame();
        let v: serde_json::Value = serde_json::from_str(&plot_line(&f.plot(), true)).unwrap();
        assert_eq!(v["type"], "plot");
        assert_eq!(v["samples"], 3);
        let v: serde_json::Value = serde_json::from_str(&labels_line(&f.labels(), true)).unwrap();
        assert_eq!(v["type"], "metrics");
        assert_eq!(v["rise_time"], "1.00");
        let v: serde_json::Value = serde_json::from_str(&summary(&f, Some("sim0"), true)).unwrap();
        assert_eq!(v["metrics"]["sampling_time"], 2.0);
        assert!(v["reported_direction"].is_null());
    }

    #[test]
    fn writer_receives_lines() {
        let mut r = ConsolePlot::new(Vec::new(), false);
        r.render_plot(&PlotFrame::default());
        let text = String::from_utf8(r.out).unwrap();
        assert!(text.contains("no samples"));
    }
}
