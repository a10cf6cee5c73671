//! Interactive focus session
//!
//! Starts a monitor over a trace replay and prints the status once a second.
//! While it runs, stdin accepts `p` to pause or resume and `e` to end. Ctrl-C
//! also ends the session.

use crate::bell::TerminalBell;
use crate::trace::{Trace, TraceCamera, TraceDetector};
use anyhow::{Context, Result};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, Tabled};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use vigil_core::{EndReason, FocusMonitor, MonitorConfig, SessionReport, StatusSnapshot};

pub struct RunOptions {
    pub trace: PathBuf,
    /// Overrides the configured default length
    pub duration_seconds: Option<u32>,
    pub fps: u32,
    pub repeat: bool,
    pub mute: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    TogglePause,
    End,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "" => None,
            "p" | "pause" | "resume" => Some(Self::TogglePause),
            "e" | "end" | "q" | "quit" => Some(Self::End),
            other => Some(Self::Unknown(other.to_string())),
        }
    }
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Forward stdin lines from a detached thread so runtime shutdown never
/// waits on a pending read
fn spawn_input_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

pub async fn handle_run(config: MonitorConfig, options: RunOptions) -> Result<()> {
    let trace = Arc::new(Trace::load(&options.trace)?);
    log::info!(
        "Replaying {} frames from {} at {} fps",
        trace.len(),
        options.trace.display(),
        options.fps
    );

    let camera = Arc::new(TraceCamera::new(trace.clone(), options.fps, options.repeat));
    let detector = Arc::new(TraceDetector::new(trace, options.fps));
    let bell = Arc::new(TerminalBell::new(!options.mute));
    let mut monitor = FocusMonitor::new(config, camera, detector, bell);

    if let Some(seconds) = options.duration_seconds {
        if !monitor.configure(seconds) {
            anyhow::bail!("Session length must be at least one second");
        }
    }

    let reporter = monitor.reporter();
    let session_id = match monitor.start().await {
        Ok(id) => id,
        Err(e) => {
            println!("{}", reporter.snapshot().label());
            return Err(e).context("Failed to start session");
        }
    };
    println!("Session {session_id} started");
    println!("Commands: p = pause/resume, e = end");

    let mut input = spawn_input_reader();
    let mut input_open = true;
    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let status = reporter.snapshot();
                println!("{}", status_line(&status));
                if !status.lifecycle.is_active() {
                    break;
                }
            }
            line = input.recv(), if input_open => {
                match line.as_deref().map(Command::parse) {
                    None => input_open = false,
                    Some(None) => {}
                    Some(Some(Command::TogglePause)) => {
                        monitor.toggle_pause();
                        let status = reporter.snapshot();
                        println!("{} ({})", status.lifecycle.description(), status.toggle_caption());
                    }
                    Some(Some(Command::End)) => break,
                    Some(Some(Command::Unknown(other))) => println!("Unknown command: {other}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                log::info!("Interrupted, ending session");
                break;
            }
        }
    }

    match monitor.end().await {
        Some(report) => print_report(&report),
        None => println!("No session was running"),
    }
    Ok(())
}

fn status_line(status: &StatusSnapshot) -> String {
    format!(
        "[{}] {:<18} {}",
        status.countdown(),
        status.label(),
        status.progress_caption()
    )
}

fn describe_reason(reason: &EndReason) -> String {
    match reason {
        EndReason::Expired => "Time is up".to_string(),
        EndReason::UserEnded => "Ended".to_string(),
        EndReason::CameraLost(detail) => format!("Camera lost: {detail}"),
    }
}

fn report_rows(report: &SessionReport) -> Vec<ReportRow> {
    let stats = &report.stats;
    vec![
        ReportRow {
            metric: "Outcome",
            value: describe_reason(&report.reason),
        },
        ReportRow {
            metric: "Frames analyzed",
            value: stats.frames_processed.to_string(),
        },
        ReportRow {
            metric: "Focused",
            value: format!("{:.1}%", stats.focus_ratio() * 100.0),
        },
        ReportRow {
            metric: "Eyes closed frames",
            value: stats.eyes_closed_frames.to_string(),
        },
        ReportRow {
            metric: "No face frames",
            value: stats.no_face_frames.to_string(),
        },
        ReportRow {
            metric: "Alerts",
            value: format!(
                "{} eyes closed, {} no face",
                stats.eyes_closed_alerts, stats.no_face_alerts
            ),
        },
        ReportRow {
            metric: "Silent alerts",
            value: stats.dropped_alerts.to_string(),
        },
        ReportRow {
            metric: "Skipped frames",
            value: (stats.duplicate_frames + stats.inference_failures).to_string(),
        },
    ]
}

fn print_report(report: &SessionReport) {
    println!("\nSession {}", report.session_id);
    println!("{}", Table::new(report_rows(report)));
}
