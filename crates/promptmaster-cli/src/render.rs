use std::fmt::Write as _;
use std::path::Path;

use promptmaster_contracts::dispatch::{routes, ModeResult, OutputSurface};
use promptmaster_contracts::results::OptimizedResult;
use serde_json::{json, Value};

pub fn render_modes() -> String {
    let mut out = String::new();
    for route in routes() {
        let _ = writeln!(out, "{:<26} {}", route.mode.id(), route.title);
        let _ = writeln!(out, "{:<26} {}", "", route.subtitle);
    }
    out
}

/// Plain-text view of a result for the mode's output surface.
pub fn render_result(result: &ModeResult, output: OutputSurface) -> String {
    match result {
        ModeResult::Optimized(optimized) if output == OutputSurface::SceneList => {
            render_scenes(optimized)
        }
        ModeResult::Optimized(optimized) => render_optimized(optimized),
        ModeResult::Image(artifact) => format!(
            "{} image, {} bytes ({})",
            artifact.source,
            artifact.bytes.len(),
            truncate_text(&artifact.data_uri(), 48)
        ),
        ModeResult::Analysis(text) if text.trim().is_empty() => {
            "(the model returned no description)".to_string()
        }
        ModeResult::Analysis(text) => text.clone(),
    }
}

fn render_optimized(result: &OptimizedResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", result.optimized.trim_end());
    let _ = writeln!(out);
    let _ = write!(out, "{}", result.explanation);
    if !result.tags.is_empty() {
        let _ = write!(out, "  [{}]", result.tags.join("] ["));
    }
    let _ = writeln!(out);
    render_sources(&mut out, result);
    out
}

fn render_scenes(result: &OptimizedResult) -> String {
    let Some(scenes) = result.scenes() else {
        return render_optimized(result);
    };
    let mut out = String::new();
    for scene in &scenes {
        let duration = if scene.duration.is_empty() {
            String::new()
        } else {
            format!(" ({})", scene.duration)
        };
        let _ = writeln!(out, "Scene {}{}: {}", scene.scene, duration, scene.description);
        let _ = writeln!(out, "    camera:   {}", scene.camera);
        let _ = writeln!(out, "    lighting: {}", scene.lighting);
    }
    let _ = writeln!(out, "{}  [{}]", result.explanation, result.tags.join("] ["));
    render_sources(&mut out, result);
    out
}

fn render_sources(out: &mut String, result: &OptimizedResult) {
    if result.sources.is_empty() {
        return;
    }
    let _ = writeln!(out, "Sources:");
    for source in &result.sources {
        match source.title.as_deref() {
            Some(title) => {
                let _ = writeln!(out, "  - {title} <{}>", source.uri);
            }
            None => {
                let _ = writeln!(out, "  - {}", source.uri);
            }
        }
    }
}

/// Machine-readable view. Image bytes are only referenced by the saved path.
pub fn result_json(result: &ModeResult, saved_to: Option<&Path>) -> Value {
    match result {
        ModeResult::Optimized(optimized) => {
            let mut value = json!(optimized);
            if let Some(scenes) = optimized.scenes() {
                value["scenes"] = json!(scenes);
            }
            value
        }
        ModeResult::Image(artifact) => json!({
            "source": artifact.source,
            "bytes": artifact.bytes.len(),
            "path": saved_to.map(|path| path.display().to_string()),
        }),
        ModeResult::Analysis(text) => json!({ "text": text }),
    }
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
