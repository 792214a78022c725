//! Desktop front end: text box, language selector, and a three-column result
//! (input, detection score, repeated-words chart).

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use eframe::{egui, App, Frame};
use shield::{AnalysisReport, AnalysisRequest, Detector, Language, RankedWord, ShieldConfig};

type Slot = Arc<Mutex<Option<Result<AnalysisReport, String>>>>;

const FLAGGED: egui::Color32 = egui::Color32::from_rgb(220, 90, 90);
const PASSED: egui::Color32 = egui::Color32::from_rgb(90, 170, 110);
const BAR: egui::Color32 = egui::Color32::from_rgb(74, 123, 208);

struct ShieldApp {
    detector: Arc<Detector>,
    input: String,
    language: Language,
    report: Option<AnalysisReport>,
    error: Option<String>,
    pending: Option<Slot>,
}

impl ShieldApp {
    fn new(detector: Arc<Detector>) -> Self {
        Self {
            detector,
            input: String::new(),
            language: Language::Auto,
            report: None,
            error: None,
            pending: None,
        }
    }

    fn start_analysis(&mut self, ctx: &egui::Context) {
        if self.input.trim().is_empty() || self.pending.is_some() {
            return;
        }
        let slot: Slot = Arc::new(Mutex::new(None));
        self.pending = Some(Arc::clone(&slot));
        self.error = None;

        let detector = Arc::clone(&self.detector);
        let request = AnalysisRequest::new(self.input.clone(), self.language);
        let ctx = ctx.clone();
        thread::spawn(move || {
            let result = detector.analyze(&request).map_err(|e| e.to_string());
            if let Ok(mut guard) = slot.lock() {
                *guard = Some(result);
            }
            ctx.request_repaint();
        });
    }

    fn poll_pending(&mut self) {
        let Some(slot) = self.pending.clone() else { return };
        let finished = slot.lock().ok().and_then(|mut guard| guard.take());
        if let Some(result) = finished {
            self.pending = None;
            match result {
                Ok(report) => self.report = Some(report),
                Err(e) => self.error = Some(e),
            }
        }
    }
}

fn word_chart(ui: &mut egui::Ui, words: &[RankedWord]) {
    if words.is_empty() {
        ui.label("No repeated words.");
        return;
    }
    let height = 220.0;
    let width = ui.available_width();
    let (response, painter) = ui.allocate_painter(egui::vec2(width, height), egui::Sense::hover());
    let rect = response.rect;
    let max = words.iter().map(|w| w.count).max().unwrap_or(1).max(1) as f32;
    let slot = rect.width() / words.len() as f32;
    let label_space = 36.0;
    let font = egui::FontId::proportional(11.0);
    let text_color = ui.visuals().text_color();

    for (i, w) in words.iter().enumerate() {
        let left = rect.left() + slot * i as f32 + slot * 0.15;
        let right = left + slot * 0.7;
        let bottom = rect.bottom() - label_space;
        let top = bottom - (bottom - rect.top() - 14.0) * (w.count as f32 / max);
        let bar = egui::Rect::from_min_max(egui::pos2(left, top), egui::pos2(right, bottom));
        painter.rect_filled(bar, 2.0, BAR);
        painter.text(
            egui::pos2(bar.center().x, top - 2.0),
            egui::Align2::CENTER_BOTTOM,
            w.count.to_string(),
            font.clone(),
            text_color,
        );
        painter.text(
            egui::pos2(bar.center().x, bottom + 4.0),
            egui::Align2::CENTER_TOP,
            &w.word,
            font.clone(),
            text_color,
        );
    }
}

impl App for ShieldApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_pending();

        egui::TopBottomPanel::top("title").show(ctx, |ui| {
            ui.heading("GPT Shield: AI Plagiarism Detector");
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ComboBox::from_label("Select text language")
                .selected_text(self.language.name())
                .show_ui(ui, |ui| {
                    for lang in Language::ALL {
                        ui.selectable_value(&mut self.language, lang, lang.name());
                    }
                });
            ui.add(
                egui::TextEdit::multiline(&mut self.input)
                    .hint_text("Enter your text")
                    .desired_rows(8)
                    .desired_width(f32::INFINITY),
            );
            ui.horizontal(|ui| {
                let busy = self.pending.is_some();
                let ready = !busy && !self.input.trim().is_empty();
                if ui.add_enabled(ready, egui::Button::new("Analyze")).clicked() {
                    self.start_analysis(ctx);
                }
                if busy {
                    ui.spinner();
                    ctx.request_repaint_after(Duration::from_millis(150));
                }
            });
            if let Some(error) = &self.error {
                ui.colored_label(FLAGGED, error);
            }

            let Some(report) = &self.report else { return };
            for warning in &report.warnings {
                ui.colored_label(egui::Color32::from_rgb(230, 160, 40), warning);
            }
            ui.separator();
            ui.columns(3, |columns| {
                if let [input_col, score_col, chart_col] = columns {
                    input_col.heading("Your Input Text");
                    egui::ScrollArea::vertical().id_salt("input").max_height(260.0).show(
                        input_col,
                        |ui| {
                            ui.label(&report.input);
                        },
                    );

                    score_col.heading("Detection Score");
                    score_col.label(format!(
                        "Perplexity: {}",
                        shield::render::format_perplexity(report.perplexity.value)
                    ));
                    score_col.label(format!("Burstiness Score: {:.2}", report.burstiness));
                    let color = if report.verdict.is_flagged() { FLAGGED } else { PASSED };
                    score_col.colored_label(
                        color,
                        format!("Text Analysis Result: {}", report.verdict),
                    );

                    chart_col.heading("Top 10 Most Repeated Words");
                    word_chart(chart_col, &report.top_words);
                }
            });
            ui.separator();
            ui.small(report.disclaimer);
        });
    }
}

fn main() -> anyhow::Result<()> {
    shield::logging::init("info");
    let config = ShieldConfig::load(None).context("loading config")?;
    let detector = Arc::new(Detector::from_config(&config).context("starting detector")?);

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "GPT Shield",
        native_options,
        Box::new(move |_| Ok(Box::new(ShieldApp::new(detector)))),
    )
    .map_err(|e| anyhow::anyhow!("gui failed: {e}"))
}
