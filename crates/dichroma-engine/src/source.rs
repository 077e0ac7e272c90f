//! Where reference LUT images come from.

use std::fmt;

use dichroma_core::{LutBuildError, LutImage, VisionMode, VisionModel};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Names a reference LUT asset.
///
/// Two requests refer to the same table exactly when their locators are
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LutLocator {
    /// Display name given to the built table.
    pub name: String,
    /// Asset path or URI of the 512×512 reference image.
    pub uri: String,
}

impl LutLocator {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
        }
    }

    /// File stem of the asset, e.g. `"protanopia"` for
    /// `"LUTs/protanopia.lut.png"`.
    pub fn stem(&self) -> &str {
        let file = self.uri.rsplit(['/', '\\']).next().unwrap_or(&self.uri);
        file.split('.').next().unwrap_or(file)
    }
}

impl From<&VisionMode> for LutLocator {
    fn from(mode: &VisionMode) -> Self {
        Self::new(&mode.name, &mode.uri)
    }
}

impl fmt::Display for LutLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.uri)
    }
}

/// Errors raised while fetching or building a LUT asset.
#[derive(Debug, thiserror::Error)]
pub enum LutSourceError {
    #[error("LUT asset not found: {0}")]
    NotFound(String),

    #[error("failed to read LUT asset: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Build(#[from] LutBuildError),

    #[error("LUT source failed: {0}")]
    Source(String),
}

/// Fetches and decodes reference images.
///
/// The returned future must not borrow `self`; it is driven on a spawned
/// task while the processor keeps rendering.
pub trait LutSource: Send + Sync + 'static {
    fn fetch(&self, locator: &LutLocator) -> BoxFuture<'static, Result<LutImage, LutSourceError>>;
}

/// Renders reference images from the built-in [`VisionModel`]s.
///
/// The locator's file stem selects the model, so the catalog's
/// `LUTs/<id>.lut.png` locators resolve without any asset on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelLutSource;

impl ModelLutSource {
    pub fn model_for(locator: &LutLocator) -> Option<VisionModel> {
        VisionModel::from_id(locator.stem())
    }
}

impl LutSource for ModelLutSource {
    fn fetch(&self, locator: &LutLocator) -> BoxFuture<'static, Result<LutImage, LutSourceError>> {
        let Some(model) = Self::model_for(locator) else {
            let uri = locator.uri.clone();
            return async move { Err(LutSourceError::NotFound(uri)) }.boxed();
        };

        async move {
            tokio::task::spawn_blocking(move || model.reference_image())
                .await
                .map_err(|e| LutSourceError::Source(format!("render task failed: {e}")))
        }
        .boxed()
    }
}
