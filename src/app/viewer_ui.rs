use crate::config::Theme;
use crate::environment::NO_ENVIRONMENT;
use crate::mesh::MeshKey;
use crate::renderer::GpuStats;
use crate::texture::DEFAULT_TEXTURE;
use crate::viewer::Viewer;

use egui::{Align2, Color32, RichText};

const TILING_RANGE: std::ops::RangeInclusive<f32> = 0.1..=100.0;

#[derive(Default)]
pub(super) struct UiActions {
    pub switch_tab: Option<usize>,
    pub remove_tab: Option<usize>,
    pub select_mesh: Option<MeshKey>,
    pub visibility: Vec<(MeshKey, bool)>,
    pub texture: Option<String>,
    pub tiling: Option<f32>,
    pub environment: Option<String>,
    pub toggle_theme: bool,
    pub pick_models: bool,
    pub pick_texture: bool,
    pub refresh_catalogues: bool,
    pub dismiss_notice: bool,
}

pub(super) struct UiParams<'a> {
    pub viewer: &'a Viewer,
    pub notice: Option<&'a str>,
    pub drop_hint: bool,
    pub pending_imports: usize,
    pub gpu: GpuStats,
}

/// Builds every panel for one frame. Panels only read the viewer; anything
/// the user asks for is recorded in `actions` and applied afterwards.
pub(super) fn draw(ctx: &egui::Context, params: &UiParams<'_>, actions: &mut UiActions) {
    ctx.set_visuals(match params.viewer.scene.theme() {
        Theme::Light => egui::Visuals::light(),
        Theme::Dark => egui::Visuals::dark(),
    });

    egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if ui.button("Upload model…").clicked() {
                actions.pick_models = true;
            }
            if ui.button("Upload texture…").clicked() {
                actions.pick_texture = true;
            }
            ui.separator();
            let theme = params.viewer.scene.theme();
            if ui.button(format!("Theme: {}", theme.label())).clicked() {
                actions.toggle_theme = true;
            }
            if ui.button("Rescan assets").clicked() {
                actions.refresh_catalogues = true;
            }
        });
        tab_strip(ui, params.viewer, actions);
    });

    egui::SidePanel::left("model_panel").resizable(true).default_width(260.0).show(ctx, |ui| {
        material_controls(ui, params.viewer, actions);
        ui.separator();
        environment_selector(ui, params.viewer, actions);
        ui.separator();
        mesh_list(ui, params.viewer, actions);
    });

    egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
        ui.horizontal(|ui| {
            let info = params.viewer.info();
            if !info.name.is_empty() {
                ui.label(RichText::new(&info.name).strong());
            }
            if !info.dimensions.is_empty() {
                ui.label(&info.dimensions);
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let loading = params.viewer.scene.loading().snapshot();
                if loading.visible {
                    ui.add(
                        egui::ProgressBar::new(loading.percent / 100.0)
                            .desired_width(200.0)
                            .text(format!("{:.0}%", loading.percent)),
                    );
                }
                if params.pending_imports > 0 {
                    ui.label(format!("{} import(s) pending", params.pending_imports));
                }
                if let Some(summary) = gpu_summary(&params.gpu) {
                    ui.label(RichText::new(summary).small().weak());
                }
            });
        });
    });

    if params.drop_hint {
        egui::Area::new(egui::Id::new("drop_hint"))
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.label(RichText::new("Drop FBX files to import").size(20.0));
                });
            });
    }

    if let Some(message) = params.notice {
        egui::Window::new("Notice")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message);
                if ui.button("OK").clicked() {
                    actions.dismiss_notice = true;
                }
            });
    }
}

fn tab_strip(ui: &mut egui::Ui, viewer: &Viewer, actions: &mut UiActions) {
    if viewer.tabs.is_empty() {
        return;
    }
    ui.horizontal_wrapped(|ui| {
        let active = viewer.tabs.active();
        for (index, tab) in viewer.tabs.tabs().iter().enumerate() {
            let response = ui
                .selectable_label(active == Some(index), &tab.name)
                .on_hover_text("Right-click to close");
            if response.clicked() {
                actions.switch_tab = Some(index);
            }
            let close = ui.small_button("×").on_hover_text("Close tab");
            if response.secondary_clicked() || close.clicked() {
                actions.remove_tab = Some(index);
            }
            ui.add_space(6.0);
        }
    });
}

fn material_controls(ui: &mut egui::Ui, viewer: &Viewer, actions: &mut UiActions) {
    ui.heading("Material");
    let controls = viewer.controls();
    let current = controls.texture.as_deref().map(|name| texture_label(viewer, name)).unwrap_or_default();
    egui::ComboBox::from_label("Texture").selected_text(current).show_ui(ui, |ui| {
        let mut choose = |ui: &mut egui::Ui, name: &str, label: &str| {
            let selected = controls.texture.as_deref() == Some(name);
            if ui.selectable_label(selected, label).clicked() {
                actions.texture = Some(name.to_string());
            }
        };
        choose(ui, DEFAULT_TEXTURE, DEFAULT_TEXTURE);
        for name in viewer.texture_catalogue() {
            choose(ui, name, name);
        }
        for uploaded in viewer.textures.uploaded() {
            choose(ui, &uploaded.name, &uploaded.label);
        }
    });

    let mut tiling = controls.tiling;
    let response = ui.horizontal(|ui| {
        ui.label("Tiling");
        ui.add(egui::DragValue::new(&mut tiling).range(TILING_RANGE).speed(0.05))
    });
    if response.inner.changed() {
        actions.tiling = Some(tiling);
    }
    let target = if viewer.selected().is_some() { "selected mesh" } else { "whole model" };
    ui.label(RichText::new(format!("Applies to the {target}")).weak());
}

fn texture_label(viewer: &Viewer, name: &str) -> String {
    viewer
        .textures
        .uploaded()
        .iter()
        .find(|uploaded| uploaded.name == name)
        .map_or_else(|| name.to_string(), |uploaded| uploaded.label.clone())
}

fn environment_selector(ui: &mut egui::Ui, viewer: &Viewer, actions: &mut UiActions) {
    let current = viewer.current_environment();
    if viewer.environment_catalogue().len() <= 1 {
        ui.label(RichText::new(format!("Environment: {NO_ENVIRONMENT} (no .hdr files found)")).weak());
        return;
    }
    egui::ComboBox::from_label("Environment").selected_text(current).show_ui(ui, |ui| {
        for name in viewer.environment_catalogue() {
            if ui.selectable_label(name == current, name).clicked() && name != current {
                actions.environment = Some(name.clone());
            }
        }
    });
}

fn mesh_list(ui: &mut egui::Ui, viewer: &Viewer, actions: &mut UiActions) {
    ui.heading("Meshes");
    let Some(model) = viewer.store.active_model() else {
        ui.label(RichText::new("No model loaded").weak());
        return;
    };
    let selected = viewer.selected();
    egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
        for node in &model.meshes {
            ui.horizontal(|ui| {
                let mut visible = node.visible;
                if ui.checkbox(&mut visible, "").changed() {
                    actions.visibility.push((node.key, visible));
                }
                let is_selected = selected == Some(node.key);
                let name = if is_selected {
                    RichText::new(node.display_name()).color(Color32::from_rgb(0xed, 0x7d, 0x31))
                } else {
                    RichText::new(node.display_name())
                };
                if ui.selectable_label(is_selected, name).clicked() {
                    actions.select_mesh = Some(node.key);
                }
            });
            ui.label(RichText::new(node.bounds().dimensions_label()).small().weak());
        }
    });
}

/// Status-bar readout of the GPU caches; hidden while nothing is uploaded.
fn gpu_summary(stats: &GpuStats) -> Option<String> {
    if stats.meshes == 0 && stats.textures == 0 {
        return None;
    }
    Some(format!("GPU: {} meshes, {} materials, {} textures", stats.meshes, stats.materials, stats.textures))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_summary_is_hidden_when_caches_are_empty() {
        assert_eq!(gpu_summary(&GpuStats::default()), None);
    }

    #[test]
    fn gpu_summary_lists_cache_counts() {
        let stats = GpuStats { meshes: 3, materials: 4, textures: 1 };
        assert_eq!(gpu_summary(&stats).as_deref(), Some("GPU: 3 meshes, 4 materials, 1 textures"));
    }
}
