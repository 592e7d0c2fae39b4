// Studio UI - record a take against the metronome, then save or export it

use crate::audio::engine::ClickEngine;
use crate::capture::recorder::MidiCapture;
use crate::capture::session::CaptureSnapshot;
use crate::config::SettingsStore;
use crate::generate::{MidiOutputPlayer, SequencePlayer};
use crate::messaging::channels::NotificationConsumer;
use crate::messaging::notification::{Notification, NotificationCategory, NotificationLevel};
use crate::midi::device::{MidiDeviceInfo, MidiDeviceManager};
use crate::midi::input::MidirAccess;
use crate::sequencer::sequence::NoteSequence;
use crate::sequencer::timeline::Tempo;
use crate::ui::canvas::EguiCanvas;
use crate::ui::metronome_view::{draw_metronome, draw_note_activity};
use eframe::egui;
use std::collections::VecDeque;

const MAX_NOTIFICATIONS: usize = 10;

pub struct StudioApp {
    capture: MidiCapture<MidirAccess>,
    settings: SettingsStore,
    tempo_ui: f64,
    click_volume_ui: f32,
    // Devices
    midi_device_manager: MidiDeviceManager,
    available_midi_devices: Vec<MidiDeviceInfo>,
    // Last finished take
    take: Option<NoteSequence>,
    player: MidiOutputPlayer,
    // Notifications
    notification_rx: NotificationConsumer,
    notification_queue: VecDeque<Notification>,
    // Keeps the click stream open while the window exists
    click_engine: Option<ClickEngine>,
}

impl StudioApp {
    pub fn new(
        capture: MidiCapture<MidirAccess>,
        settings: SettingsStore,
        notification_rx: NotificationConsumer,
    ) -> Self {
        let midi_device_manager = MidiDeviceManager::new();
        let available_midi_devices = midi_device_manager.list_input_ports();
        let current = settings.current();
        let player = MidiOutputPlayer::new(current.midi_output.clone());
        let tempo_ui = current.capture.tempo_bpm;
        let click_volume_ui = current.capture.click_volume;

        Self {
            capture,
            settings,
            tempo_ui,
            click_volume_ui,
            midi_device_manager,
            available_midi_devices,
            take: None,
            player,
            notification_rx,
            notification_queue: VecDeque::new(),
            click_engine: None,
        }
    }

    pub fn with_click_engine(mut self, engine: Option<ClickEngine>) -> Self {
        if engine.is_none() {
            self.push_notification(Notification::warning(
                NotificationCategory::Audio,
                "Metronome click off",
            ));
        }
        self.click_engine = engine;
        self
    }

    fn push_notification(&mut self, notification: Notification) {
        self.notification_queue.push_back(notification);
        if self.notification_queue.len() > MAX_NOTIFICATIONS {
            self.notification_queue.pop_front();
        }
    }

    /// Drain notifications sent by the capture threads
    fn update_notifications(&mut self) {
        while let Some(notification) =
            ringbuf::traits::Consumer::try_pop(&mut self.notification_rx)
        {
            self.push_notification(notification);
        }
    }

    /// Notifications younger than 5 seconds, newest first
    fn recent_notifications(&self) -> Vec<&Notification> {
        self.notification_queue
            .iter()
            .rev()
            .filter(|n| n.is_recent(5000))
            .take(3)
            .collect()
    }

    fn collect_finished_take(&mut self) {
        if let Some(sequence) = self.capture.try_finished() {
            self.capture.cleanup();
            self.take = Some(sequence);
        }
    }

    fn start_capture(&mut self) {
        let Some(tempo) = Tempo::try_new(self.tempo_ui) else {
            self.push_notification(Notification::error(
                NotificationCategory::Capture,
                format!("Invalid tempo {}", self.tempo_ui),
            ));
            return;
        };

        self.take = None;
        if let Err(e) = self.capture.start_capture(tempo) {
            self.push_notification(Notification::error(NotificationCategory::Midi, e.to_string()));
        }
    }

    fn stop_capture(&mut self) {
        let sequence = self.capture.stop_capture();
        self.capture.cleanup();
        self.push_notification(Notification::info(
            NotificationCategory::Capture,
            format!("Take stopped with {} notes", sequence.len()),
        ));
        self.take = Some(sequence);
    }

    fn save_take(&mut self) {
        let Some(take) = &self.take else {
            return;
        };

        let file_name = crate::default_take_file_name();
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Note sequence", &["json"])
            .set_file_name(&file_name)
            .save_file()
        else {
            return;
        };

        let result = take
            .to_json_pretty()
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));

        let notification = match result {
            Ok(()) => Notification::info(
                NotificationCategory::Generic,
                format!("Saved {}", path.display()),
            ),
            Err(e) => Notification::error(NotificationCategory::Generic, format!("Save failed: {e}")),
        };
        self.push_notification(notification);
    }

    fn copy_data_url(&mut self, ctx: &egui::Context) {
        let Some(take) = &self.take else {
            return;
        };
        match take.to_data_url() {
            Ok(url) => {
                ctx.copy_text(url);
                self.push_notification(Notification::info(
                    NotificationCategory::Generic,
                    "Data URL copied to clipboard",
                ));
            }
            Err(e) => self.push_notification(Notification::error(
                NotificationCategory::Generic,
                e.to_string(),
            )),
        }
    }

    fn toggle_playback(&mut self) {
        if self.player.is_playing() {
            self.player.stop();
            return;
        }
        let Some(take) = &self.take else {
            return;
        };
        if let Err(e) = self.player.play(take) {
            self.push_notification(Notification::error(
                NotificationCategory::Midi,
                format!("Playback failed: {e}"),
            ));
        }
    }

    fn draw_devices(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("MIDI inputs:");
            if self.available_midi_devices.is_empty() {
                ui.colored_label(egui::Color32::GRAY, "none found");
            } else {
                let filter = self.capture.access().port_filter();
                for device in &self.available_midi_devices {
                    let used = filter.is_none_or(|f| device.matches(f));
                    let color = if used {
                        egui::Color32::GREEN
                    } else {
                        egui::Color32::GRAY
                    };
                    ui.colored_label(color, "●");
                    ui.label(&device.name);
                }
            }

            if ui.button("🔄").on_hover_text("Refresh devices").clicked() {
                self.available_midi_devices = self.midi_device_manager.list_input_ports();
            }
        });
    }

    fn draw_transport(&mut self, ui: &mut egui::Ui) {
        let active = self.capture.is_active();

        ui.horizontal(|ui| {
            ui.label("Tempo:");
            let slider = egui::Slider::new(&mut self.tempo_ui, 40.0..=240.0).suffix(" BPM");
            if ui.add(slider).changed()
                && let Some(tempo) = Tempo::try_new(self.tempo_ui)
            {
                self.capture.set_tempo(tempo);
                let bpm = self.tempo_ui;
                self.settings.update(|s| s.capture.tempo_bpm = bpm);
            }

            if let Some(engine) = &self.click_engine {
                ui.add_space(20.0);
                ui.label("Click:");
                let slider = egui::Slider::new(&mut self.click_volume_ui, 0.0..=1.0);
                if ui.add(slider).changed() {
                    let volume = self.click_volume_ui;
                    engine.volume.set(volume);
                    self.settings.update(|s| s.capture.click_volume = volume);
                }
            }

            ui.add_space(20.0);

            if active {
                if ui.button("⏹ Stop").clicked() {
                    self.stop_capture();
                }
            } else if ui.button("⏺ Record").clicked() {
                self.start_capture();
            }
        });
    }

    fn draw_capture_view(&self, ui: &mut egui::Ui, snapshot: &CaptureSnapshot) {
        let size = egui::vec2(ui.available_width(), 220.0);
        let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
        let mut canvas = EguiCanvas::new(&painter, response.rect, egui::Color32::from_gray(20));

        draw_note_activity(&mut canvas, snapshot);
        draw_metronome(&mut canvas, snapshot);
    }

    fn draw_take(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let Some(take) = &self.take else {
            ui.label("No take yet");
            return;
        };

        ui.label(format!(
            "Last take: {} notes, {:.2}s at {:.0} BPM",
            take.len(),
            take.total_time,
            take.qpm()
        ));
        ui.horizontal(|ui| {
            if ui.button("💾 Save JSON").clicked() {
                self.save_take();
            }
            if ui.button("📋 Copy data URL").clicked() {
                self.copy_data_url(ctx);
            }
            let label = if self.player.is_playing() {
                "⏹ Stop playback"
            } else {
                "▶ Play"
            };
            if ui.button(label).clicked() {
                self.toggle_playback();
            }
        });
    }

    fn draw_status_bar(&self, ui: &mut egui::Ui) {
        ui.separator();
        ui.horizontal(|ui| {
            let recent = self.recent_notifications();

            if recent.is_empty() {
                ui.label("Ready");
            } else {
                for notification in recent {
                    let (icon, color) = match notification.level {
                        NotificationLevel::Info => ("ℹ", egui::Color32::from_rgb(100, 150, 255)),
                        NotificationLevel::Warning => ("⚠", egui::Color32::from_rgb(255, 165, 0)),
                        NotificationLevel::Error => ("✖", egui::Color32::RED),
                    };

                    ui.colored_label(color, icon);
                    ui.colored_label(color, &notification.message);
                    ui.add_space(10.0);
                }
            }
        });
    }
}

impl eframe::App for StudioApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // The playhead moves every step
        ctx.request_repaint();

        self.update_notifications();
        self.collect_finished_take();
        let snapshot = self.capture.snapshot();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Rythmiq Studio");
            ui.separator();

            self.draw_devices(ui);
            ui.add_space(10.0);
            self.draw_transport(ui);
            ui.add_space(10.0);
            self.draw_capture_view(ui, &snapshot);
            ui.add_space(10.0);
            self.draw_take(ui, ctx);

            ui.add_space(10.0);
            self.draw_status_bar(ui);
        });
    }
}

impl Drop for StudioApp {
    fn drop(&mut self) {
        self.player.stop();
        self.capture.cleanup();
        match self.settings.save() {
            Ok(true) => {}
            Ok(false) => log::info!("Settings file left unchanged"),
            Err(e) => log::warn!("Settings not saved: {e}"),
        }
    }
}
