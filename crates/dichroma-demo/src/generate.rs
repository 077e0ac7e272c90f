//! `generate`: write reference LUT images for the simulation models.

use std::path::PathBuf;

use dichroma_core::VisionModel;

use crate::cli::GenerateArgs;
use crate::error::DemoError;

/// Run [`generate`] on the blocking pool.
pub async fn generate_async(args: GenerateArgs) -> Result<(), DemoError> {
    tokio::task::spawn_blocking(move || generate(&args).map(|_| ())).await?
}

/// Write `<id>.lut.png` for each requested model and return the paths.
pub fn generate(args: &GenerateArgs) -> Result<Vec<PathBuf>, DemoError> {
    let models = resolve_models(&args.modes)?;
    std::fs::create_dir_all(&args.out)?;

    let mut written = Vec::with_capacity(models.len());
    for model in models {
        let path = args.out.join(format!("{}.lut.png", model.id()));
        let image = model.reference_image();
        let rgba = image
            .to_rgba_image()
            .ok_or_else(|| DemoError::InvalidImage(model.id().to_string()))?;
        rgba.save(&path)?;
        tracing::info!("wrote {model} to {}", path.display());
        written.push(path);
    }
    Ok(written)
}

fn resolve_models(ids: &[String]) -> Result<Vec<VisionModel>, DemoError> {
    if ids.is_empty() {
        return Ok(VisionModel::ALL.to_vec());
    }
    ids.iter()
        .map(|id| VisionModel::from_id(id).ok_or_else(|| DemoError::UnknownMode(id.clone())))
        .collect()
}
