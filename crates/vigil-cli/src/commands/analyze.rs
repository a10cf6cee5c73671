//! Offline trace analysis
//!
//! Feeds every recorded frame through the classifier and alert rules without
//! pacing, then prints how the session would have been judged.

use crate::trace::Trace;
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, Tabled};
use vigil_core::{
    AlertDispatcher, AlertKind, AttentionState, AudioOutput, EyeStateClassifier, MonitorConfig,
    MonitorError,
};

/// Accepts every tone without playing it
struct SilentOutput;

impl AudioOutput for SilentOutput {
    fn is_ready(&self) -> bool {
        true
    }

    fn beep(&self, _frequency_hz: f32, _duration: Duration) -> Result<(), MonitorError> {
        Ok(())
    }
}

#[derive(Tabled)]
struct StateRow {
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Frames")]
    frames: u64,
    #[tabled(rename = "Share")]
    share: String,
}

#[derive(Tabled)]
struct TransitionRow {
    #[tabled(rename = "Time (s)")]
    time: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Smoothed EAR")]
    smoothed: String,
    #[tabled(rename = "Alert")]
    alert: String,
}

#[derive(Debug, Default)]
struct Analysis {
    frames: u64,
    per_state: HashMap<AttentionState, u64>,
    alerts: HashMap<AlertKind, u32>,
    transitions: Vec<Transition>,
}

#[derive(Debug)]
struct Transition {
    at: Duration,
    state: AttentionState,
    smoothed: Option<f32>,
    alert: Option<AlertKind>,
}

fn analyze(trace: &Trace, config: &MonitorConfig) -> Analysis {
    let mut classifier = EyeStateClassifier::new(config.classifier.clone());
    let mut alerts = AlertDispatcher::new(Arc::new(SilentOutput), config.alert.clone());
    let mut analysis = Analysis::default();
    let mut previous = AttentionState::Unknown;

    for sample in trace.samples() {
        let Some(outcome) = classifier.process(&sample) else {
            continue;
        };
        analysis.frames += 1;
        *analysis.per_state.entry(outcome.state).or_default() += 1;

        let alert = alerts.observe(&outcome).map(|event| event.kind);
        if let Some(kind) = alert {
            *analysis.alerts.entry(kind).or_default() += 1;
        }
        if outcome.state != previous {
            analysis.transitions.push(Transition {
                at: sample.timestamp,
                state: outcome.state,
                smoothed: outcome.measurement.map(|m| m.smoothed_average),
                alert,
            });
            previous = outcome.state;
        }
    }
    analysis
}

pub fn handle_analyze(config: &MonitorConfig, path: &Path, show_transitions: bool) -> Result<()> {
    let trace = Trace::load(path)?;
    if trace.is_empty() {
        println!("Trace {} has no frames", path.display());
        return Ok(());
    }
    let analysis = analyze(&trace, config);

    println!("\nAttention summary: {}", path.display());
    println!("{}", "=".repeat(40));
    println!("{}", Table::new(state_rows(&analysis)));

    println!(
        "\nAlerts: {} eyes closed, {} no face",
        analysis.alerts.get(&AlertKind::EyesClosed).unwrap_or(&0),
        analysis.alerts.get(&AlertKind::NoFace).unwrap_or(&0)
    );

    if show_transitions {
        let rows: Vec<TransitionRow> = analysis
            .transitions
            .iter()
            .map(|t| TransitionRow {
                time: format!("{:.3}", t.at.as_secs_f64()),
                state: t.state.to_string(),
                smoothed: t.smoothed.map_or_else(|| "-".to_string(), |v| format!("{v:.3}")),
                alert: t.alert.map_or_else(String::new, |k| k.to_string()),
            })
            .collect();
        println!("\n{}", Table::new(rows));
    }
    Ok(())
}

fn state_rows(analysis: &Analysis) -> Vec<StateRow> {
    [
        AttentionState::Focused,
        AttentionState::EyesClosed,
        AttentionState::NoFace,
    ]
    .into_iter()
    .map(|state| {
        let frames = analysis.per_state.get(&state).copied().unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        let share = if analysis.frames == 0 {
            0.0
        } else {
            frames as f64 * 100.0 / analysis.frames as f64
        };
        StateRow {
            state: state.to_string(),
            frames,
            share: format!("{share:.1}%"),
        }
    })
    .collect()
}
