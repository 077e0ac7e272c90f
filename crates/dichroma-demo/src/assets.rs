//! LUT assets on disk, with in-memory generation as a fallback.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use dichroma_core::LutImage;
use dichroma_engine::{LutLocator, LutSource, LutSourceError, ModelLutSource};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;

/// Loads reference images from a directory.
///
/// A locator resolves to `<root>/<uri>`, or to `<root>/<file name>` when the
/// full path does not exist. Locators naming a built-in simulation model are
/// rendered in memory if neither file exists.
#[derive(Debug, Clone)]
pub struct FileLutSource {
    root: PathBuf,
}

impl FileLutSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, locator: &LutLocator) -> PathBuf {
        let direct = self.root.join(&locator.uri);
        if direct.exists() {
            return direct;
        }
        match Path::new(&locator.uri).file_name() {
            Some(name) => self.root.join(name),
            None => direct,
        }
    }

    fn load(&self, locator: &LutLocator) -> Result<LutImage, LutSourceError> {
        let path = self.resolve(locator);
        match std::fs::read(&path) {
            Ok(bytes) => {
                tracing::debug!("decoding {}", path.display());
                Ok(LutImage::decode(&bytes)?)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => match ModelLutSource::model_for(locator) {
                Some(model) => {
                    tracing::info!("no asset at {}, rendering {model} in memory", path.display());
                    Ok(model.reference_image())
                }
                None => Err(LutSourceError::NotFound(path.display().to_string())),
            },
            Err(e) => Err(e.into()),
        }
    }
}

impl LutSource for FileLutSource {
    fn fetch(&self, locator: &LutLocator) -> BoxFuture<'static, Result<LutImage, LutSourceError>> {
        let source = self.clone();
        let locator = locator.clone();
        async move {
            tokio::task::spawn_blocking(move || source.load(&locator))
                .await
                .map_err(|e| LutSourceError::Source(format!("asset task failed: {e}")))?
        }
        .boxed()
    }
}
