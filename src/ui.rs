use eframe::egui;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

use crate::dashboard::Dashboard;
use crate::document::{Content, Region};
use crate::state::{CompanionStatus, Frame, OverlayPhase, ScreenshotView};

const REPAINT_INTERVAL: Duration = Duration::from_millis(250);
const ACCENT: egui::Color32 = egui::Color32::from_rgb(100, 149, 237);

pub struct DashboardApp {
    dashboard: Arc<Dashboard>,
    runtime: Handle,
    texture: Option<(Arc<Frame>, egui::TextureHandle)>,
}

impl DashboardApp {
    pub fn new(cc: &eframe::CreationContext<'_>, dashboard: Arc<Dashboard>, runtime: Handle) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        Self {
            dashboard,
            runtime,
            texture: None,
        }
    }

    fn render_header(&self, ui: &mut egui::Ui) {
        let status = self.dashboard.state.read().companion_status;
        let dot = match status {
            CompanionStatus::Ready => egui::Color32::GREEN,
            CompanionStatus::Error => egui::Color32::from_rgb(239, 68, 68),
            CompanionStatus::Offline | CompanionStatus::Unknown => egui::Color32::GRAY,
        };

        ui.horizontal(|ui| {
            ui.heading(egui::RichText::new("Automoy").size(28.0).strong().color(ACCENT));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(status.label());
                let (rect, _) = ui.allocate_exact_size(egui::vec2(10.0, 10.0), egui::Sense::hover());
                ui.painter().circle_filled(rect.center(), 5.0, dot);
            });
        });
    }

    fn render_region(&self, ui: &mut egui::Ui, region: Region) {
        let Some(content) = self.dashboard.document.content(region) else {
            return;
        };
        egui::Frame::new()
            .fill(egui::Color32::from_rgb(30, 30, 30))
            .corner_radius(8.0)
            .inner_margin(10.0)
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.label(egui::RichText::new(region.title()).strong().color(ACCENT));
                match content {
                    Content::Text(text) => {
                        ui.label(text);
                    }
                    Content::List(items) => {
                        for item in items {
                            ui.label(format!("• {}", item.text));
                            if let Some(detail) = item.detail {
                                ui.label(egui::RichText::new(detail).monospace().size(12.0));
                            }
                        }
                    }
                }
            });
        ui.add_space(8.0);
    }

    fn render_controls(&self, ui: &mut egui::Ui) {
        let face = self.dashboard.pause.face();
        let button = ui
            .add(
                egui::Button::new(egui::RichText::new(format!("{} {}", face.icon, face.label)).size(16.0))
                    .min_size(egui::vec2(110.0, 30.0)),
            )
            .on_hover_text(face.title);
        if button.clicked() {
            let pause = self.dashboard.pause.clone();
            self.runtime.spawn(async move {
                // errors are logged inside toggle
                let _ = pause.toggle().await;
            });
        }
    }

    fn render_goal_input(&self, ui: &mut egui::Ui) {
        let mut submit = false;
        ui.horizontal(|ui| {
            let available_width = ui.available_width() - 80.0;
            let response = {
                let mut state = self.dashboard.state.write();
                ui.add(
                    egui::TextEdit::singleline(&mut state.goal_input)
                        .hint_text("Enter your goal...")
                        .desired_width(available_width)
                        .font(egui::FontId::proportional(16.0)),
                )
            };
            let send = ui.add(
                egui::Button::new(egui::RichText::new("Send").size(16.0).strong())
                    .fill(ACCENT)
                    .min_size(egui::vec2(60.0, 28.0)),
            );
            submit = send.clicked()
                || (response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)));
        });

        if submit {
            let goal = self.dashboard.goal.clone();
            self.runtime.spawn(async move {
                goal.submit().await;
            });
        }
    }

    fn render_screenshot(&mut self, ui: &mut egui::Ui) {
        let view = self.dashboard.state.read().screenshot.clone();
        match view {
            ScreenshotView::Placeholder { message } => {
                self.texture = None;
                ui.allocate_ui(egui::vec2(ui.available_width(), 200.0), |ui| {
                    ui.centered_and_justified(|ui| {
                        ui.label(egui::RichText::new(message).color(egui::Color32::GRAY));
                    });
                });
            }
            ScreenshotView::Image { kind, frame } => {
                let stale = !matches!(&self.texture, Some((shown, _)) if Arc::ptr_eq(shown, &frame));
                if stale {
                    let image = egui::ColorImage::from_rgba_unmultiplied(
                        [frame.width as usize, frame.height as usize],
                        &frame.rgba,
                    );
                    let handle = ui
                        .ctx()
                        .load_texture("screenshot", image, egui::TextureOptions::LINEAR);
                    self.texture = Some((frame, handle));
                }
                if let Some((_, handle)) = &self.texture {
                    ui.add(egui::Image::new(handle).max_width(ui.available_width()))
                        .on_hover_text(format!("{kind} screenshot"));
                }
            }
        }
    }

    fn render_overlay(&self, ctx: &egui::Context, rect: egui::Rect) {
        let phase = self.dashboard.loading.phase();
        if phase == OverlayPhase::Removed {
            return;
        }
        let alpha = if phase == OverlayPhase::Hiding { 120 } else { 245 };
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("loading_overlay"),
        ));
        painter.rect_filled(rect, 0.0, egui::Color32::from_black_alpha(alpha));
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "Loading Automoy...",
            egui::FontId::proportional(28.0),
            egui::Color32::WHITE,
        );
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.dashboard.loading.hide("Escape key pressed");
        }

        let panel = egui::CentralPanel::default().show(ctx, |ui| {
            self.render_header(ui);
            ui.separator();

            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    ui.columns(2, |cols| {
                        for region in [
                            Region::UserGoal,
                            Region::FormulatedObjective,
                            Region::CurrentOperation,
                            Region::PastOperation,
                        ] {
                            self.render_region(&mut cols[0], region);
                        }
                        self.render_controls(&mut cols[0]);
                        cols[0].add_space(10.0);
                        self.render_goal_input(&mut cols[0]);

                        self.render_screenshot(&mut cols[1]);
                        cols[1].add_space(10.0);
                        for region in [
                            Region::VisualAnalysis,
                            Region::ThinkingProcess,
                            Region::StepsList,
                            Region::Operations,
                            Region::LlmStream,
                        ] {
                            self.render_region(&mut cols[1], region);
                        }
                    });
                });
        });

        self.render_overlay(ctx, panel.response.rect);
        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}
