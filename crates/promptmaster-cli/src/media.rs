use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use promptmaster_contracts::results::{to_data_uri, AudioArtifact, ImageArtifact};

/// Reads an image file into a data URI, declaring the sniffed format.
pub fn image_data_uri(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let format = image::guess_format(&bytes)
        .with_context(|| format!("{} is not a recognized image", path.display()))?;
    Ok(to_data_uri(format.to_mime_type(), &bytes))
}

pub fn save_image(path: &Path, artifact: &ImageArtifact) -> Result<()> {
    write_bytes(path, &artifact.bytes)
}

/// Raw s16le PCM; play with e.g. `ffplay -f s16le -ar 24000 -ac 1`.
pub fn save_pcm(path: &Path, audio: &AudioArtifact) -> Result<()> {
    write_bytes(path, audio.pcm_bytes())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}
