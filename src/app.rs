//! Breath Coach window: the egui/eframe application.
//!
//! [`BreathApp`] is the top-level [`eframe::App`].  It never touches the
//! monitor directly:
//!
//! * it reads [`SharedState`] once per frame (written by the runner through
//!   its `RenderSink` impl);
//! * it sends [`MonitorCommand`]s to the runner over `command_tx`;
//! * it drains hotkey events from `hotkey_rx` and turns each one into a
//!   start or a stop depending on the current phase.
//!
//! # Layout
//!
//! | Section    | Content |
//! |------------|---------|
//! | Controls   | Start / Stop buttons, status, hotkey hint |
//! | Metrics    | strength `N%`, duration `Ns`, rhythm `N RPM`, quality label, each with a bar |
//! | Waveform   | live amplitude line, blank while idle |
//! | Evaluation | overall advice and one marker per metric hint |
//! | Error      | last failure and what to do about it |

use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use crate::audio::WaveformData;
use crate::config::AppConfig;
use crate::hotkey::HotkeyEvent;
use crate::monitor::{
    lock_state, ErrorReport, MonitorCommand, MonitorPhase, QualityLabel, SessionSnapshot,
    Severity, SharedState,
};

const ACCENT: egui::Color32 = egui::Color32::from_rgb(0x42, 0x99, 0xe1);
const STRENGTH_BAR: egui::Color32 = egui::Color32::from_rgb(0x48, 0xbb, 0x78);
const DURATION_BAR: egui::Color32 = ACCENT;
const RHYTHM_BAR: egui::Color32 = egui::Color32::from_rgb(0x9f, 0x7a, 0xea);
const TEXT_DIM: egui::Color32 = egui::Color32::from_rgb(150, 150, 150);
const ERROR_RED: egui::Color32 = egui::Color32::from_rgb(0xf5, 0x65, 0x65);
const WAVEFORM_HEIGHT: f32 = 120.0;
/// Repaint cadence while idle, so hotkey presses are noticed.
const IDLE_REPAINT: Duration = Duration::from_millis(250);

/// Command that toggles monitoring from `phase`.
pub fn toggle_command(phase: MonitorPhase) -> MonitorCommand {
    if phase.is_active() {
        MonitorCommand::Stop
    } else {
        MonitorCommand::Start
    }
}

fn severity_color(severity: Severity) -> egui::Color32 {
    match severity {
        Severity::Good => egui::Color32::from_rgb(0x48, 0xbb, 0x78),
        Severity::Caution => egui::Color32::from_rgb(0xec, 0xc9, 0x4b),
        Severity::Poor => ERROR_RED,
    }
}

fn quality_color(label: QualityLabel) -> egui::Color32 {
    let (r, g, b) = label.rgb();
    egui::Color32::from_rgb(r, g, b)
}

/// Everything one frame needs, copied out of the shared state so the lock is
/// held only briefly.
struct FrameView {
    phase: MonitorPhase,
    snapshot: Option<SessionSnapshot>,
    waveform: Vec<u8>,
    error: Option<ErrorReport>,
}

// ---------------------------------------------------------------------------
// BreathApp
// ---------------------------------------------------------------------------

pub struct BreathApp {
    state: SharedState,
    command_tx: mpsc::Sender<MonitorCommand>,
    hotkey_rx: mpsc::Receiver<HotkeyEvent>,
    config: AppConfig,
    /// Last known outer window position, saved on exit.
    window_position: Option<egui::Pos2>,
}

impl BreathApp {
    pub fn new(
        state: SharedState,
        command_tx: mpsc::Sender<MonitorCommand>,
        hotkey_rx: mpsc::Receiver<HotkeyEvent>,
        config: AppConfig,
    ) -> Self {
        Self {
            state,
            command_tx,
            hotkey_rx,
            config,
            window_position: None,
        }
    }

    fn send(&self, cmd: MonitorCommand) {
        if let Err(e) = self.command_tx.try_send(cmd) {
            log::warn!("ui: could not send {cmd:?}: {e}");
        }
    }

    fn view(&self) -> FrameView {
        let st = lock_state(&self.state);
        FrameView {
            phase: st.phase,
            snapshot: st.snapshot,
            waveform: if st.phase.is_active() {
                st.waveform.clone()
            } else {
                Vec::new()
            },
            error: st.error.clone(),
        }
    }

    fn poll_hotkey(&mut self, phase: MonitorPhase) {
        // Several presses within one frame collapse to the state they toggle to.
        let mut presses = 0usize;
        while let Ok(HotkeyEvent::ToggleMonitoring) = self.hotkey_rx.try_recv() {
            presses += 1;
        }
        if presses % 2 == 1 {
            self.send(toggle_command(phase));
        }
    }

    // ── Sections ─────────────────────────────────────────────────────────

    fn draw_controls(&self, ui: &mut egui::Ui, phase: MonitorPhase) {
        ui.horizontal(|ui| {
            let active = phase.is_active();
            if ui
                .add_enabled(!active, egui::Button::new("Start"))
                .clicked()
            {
                self.send(MonitorCommand::Start);
            }
            if ui.add_enabled(active, egui::Button::new("Stop")).clicked() {
                self.send(MonitorCommand::Stop);
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(
                    egui::RichText::new(format!("{} toggles", self.config.hotkey.toggle_key))
                        .color(TEXT_DIM)
                        .size(11.0),
                );
                let status_color = if active { ACCENT } else { TEXT_DIM };
                ui.label(egui::RichText::new(phase.label()).color(status_color));
            });
        });
    }

    fn draw_metrics(&self, ui: &mut egui::Ui, snapshot: Option<&SessionSnapshot>) {
        let snap = snapshot.copied().unwrap_or_else(empty_snapshot);
        let bars = snap.bar_levels();
        let quality = snap.evaluation.quality;

        egui::Grid::new("metrics")
            .num_columns(3)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                let strength = format!("{}%", snap.strength);
                metric_row(ui, "Strength", strength, bars.strength, STRENGTH_BAR);
                let duration = format!("{}s", snap.duration_secs);
                metric_row(ui, "Duration", duration, bars.duration, DURATION_BAR);
                let rhythm = format!("{} RPM", snap.rhythm);
                metric_row(ui, "Rhythm", rhythm, bars.rhythm, RHYTHM_BAR);
                metric_row(
                    ui,
                    "Quality",
                    quality.label().to_owned(),
                    bars.quality,
                    quality_color(quality),
                );
            });
    }

    fn draw_waveform(&self, ui: &mut egui::Ui, amplitude: &[u8]) {
        let (rect, _) = ui.allocate_exact_size(
            egui::vec2(ui.available_width(), WAVEFORM_HEIGHT),
            egui::Sense::hover(),
        );
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 4.0, egui::Color32::from_rgb(20, 24, 30));

        if amplitude.is_empty() {
            return;
        }

        let wave = WaveformData::from_amplitude(amplitude, rect.width(), rect.height());
        let points: Vec<egui::Pos2> = wave
            .points
            .iter()
            .map(|&[x, y]| rect.left_top() + egui::vec2(x, y))
            .collect();
        painter.add(egui::Shape::line(points, egui::Stroke::new(2.0, ACCENT)));
    }

    fn draw_evaluation(&self, ui: &mut egui::Ui, snapshot: &SessionSnapshot) {
        let eval = snapshot.evaluation;

        ui.label(
            egui::RichText::new(eval.quality.label())
                .color(quality_color(eval.quality))
                .strong(),
        );
        ui.label(egui::RichText::new(eval.quality.advice()).size(12.0));
        ui.add_space(4.0);

        hint_row(ui, "Strength", eval.strength.text(), eval.strength.severity());
        match eval.rhythm {
            Some(hint) => hint_row(ui, "Rhythm", hint.text(), hint.severity()),
            None => {
                let waiting = "Rhythm: waiting for the first breath";
                ui.label(egui::RichText::new(waiting).color(TEXT_DIM));
            }
        }
        hint_row(ui, "Duration", eval.duration.text(), eval.duration.severity());
    }

    fn draw_error(&self, ui: &mut egui::Ui, report: &ErrorReport) {
        egui::Frame::group(ui.style())
            .stroke(egui::Stroke::new(1.0, ERROR_RED))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(egui::RichText::new(&report.message).color(ERROR_RED).strong());
                if let Some(advice) = &report.remediation {
                    ui.label(egui::RichText::new(advice).size(12.0));
                }
            });
    }
}

fn empty_snapshot() -> SessionSnapshot {
    SessionSnapshot {
        strength: 0,
        duration_secs: 0,
        rhythm: 0,
        quality: 0,
        breath_count: 0,
        evaluation: crate::monitor::Evaluation::from_metrics(0, 0, 0, 0),
    }
}

fn metric_row(
    ui: &mut egui::Ui,
    name: &str,
    value: String,
    fill_pct: f32,
    color: egui::Color32,
) {
    ui.label(name);
    ui.add(
        egui::ProgressBar::new(fill_pct / 100.0)
            .fill(color)
            .desired_width(220.0),
    );
    ui.label(egui::RichText::new(value).monospace());
    ui.end_row();
}

fn hint_row(ui: &mut egui::Ui, name: &str, text: &str, severity: Severity) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new("●").color(severity_color(severity)));
        ui.label(format!("{name}: {text}"));
    });
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for BreathApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let view = self.view();
        self.poll_hotkey(view.phase);

        if let Some(rect) = ctx.input(|i| i.viewport().outer_rect) {
            self.window_position = Some(rect.min);
        }

        if view.phase.is_active() {
            ctx.request_repaint_after(Duration::from_millis(self.config.monitor.frame_interval_ms));
        } else {
            ctx.request_repaint_after(IDLE_REPAINT);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Breath Coach");
            ui.add_space(4.0);
            self.draw_controls(ui, view.phase);
            ui.separator();

            self.draw_metrics(ui, view.snapshot.as_ref());
            ui.add_space(8.0);
            self.draw_waveform(ui, &view.waveform);
            ui.add_space(8.0);

            if let Some(snapshot) = &view.snapshot {
                self.draw_evaluation(ui, snapshot);
            }
            if let Some(report) = &view.error {
                ui.add_space(8.0);
                self.draw_error(ui, report);
            }
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("Breath Coach closing");
        self.send(MonitorCommand::Stop);

        let Some(pos) = self.window_position else {
            return;
        };
        let pos = (pos.x, pos.y);
        if self.config.ui.window_position != Some(pos) {
            self.config.ui.window_position = Some(pos);
            if let Err(e) = self.config.save() {
                log::warn!("ui: could not save window position: {e:#}");
            }
        }
    }
}
