use super::archive;
use super::datagen::{DataGenerator, GeneratorInvocation, JavaDataGenerator};
use super::{validate_version, AssetPaths, BUNDLE_SUBDIRS};
use crate::config::DatagenConfig;
use anyhow::{Context, Result};
use futures::future::{self, LocalBoxFuture, Shared};
use futures::FutureExt;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;

/// Failure of one unpack run, shared by every caller that awaited it.
#[derive(Debug, Clone, Error)]
#[error("failed to unpack version '{version}': {cause:#}")]
pub struct UnpackError {
    pub version: String,
    pub cause: Arc<anyhow::Error>,
}

pub type UnpackTask = Shared<LocalBoxFuture<'static, Result<(), UnpackError>>>;

type TaskTable = Rc<RefCell<HashMap<String, UnpackTask>>>;

/// Materializes version bundles on disk, at most one unpack per version at a time.
pub struct VersionAssetManager {
    paths: AssetPaths,
    datagen: DatagenConfig,
    generator: Rc<dyn DataGenerator>,
    tasks: TaskTable,
}

impl VersionAssetManager {
    pub fn new(paths: AssetPaths, datagen: DatagenConfig) -> Self {
        Self::with_generator(paths, datagen, Rc::new(JavaDataGenerator))
    }

    pub fn with_generator(paths: AssetPaths, datagen: DatagenConfig, generator: Rc<dyn DataGenerator>) -> Self {
        Self { paths, datagen, generator, tasks: Rc::new(RefCell::new(HashMap::new())) }
    }

    pub fn paths(&self) -> &AssetPaths {
        &self.paths
    }

    pub fn is_unpacked(&self, version: &str) -> bool {
        self.paths.bundle_dir(version).is_dir()
    }

    pub fn live_tasks(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Returns a future that completes once the bundle for `version` exists.
    ///
    /// Calls made while an unpack is running get a clone of the running task, so they all observe
    /// the same outcome. The live entry is dropped when the task settles; a failed unpack leaves
    /// nothing behind and the next call starts over.
    pub fn ensure_unpacked(&self, version: &str) -> UnpackTask {
        if let Err(err) = validate_version(version) {
            return settled(Err(UnpackError { version: version.to_string(), cause: Arc::new(err) }));
        }
        if self.is_unpacked(version) {
            return settled(Ok(()));
        }
        if let Some(task) = self.tasks.borrow().get(version) {
            return task.clone();
        }

        let task = {
            let tasks = Rc::clone(&self.tasks);
            let paths = self.paths.clone();
            let datagen = self.datagen.clone();
            let generator = Rc::clone(&self.generator);
            let version = version.to_string();
            async move {
                let outcome = unpack_version(&paths, &datagen, generator.as_ref(), &version).await;
                tasks.borrow_mut().remove(&version);
                match outcome {
                    Ok(()) => {
                        log::info!(target: "assets", "Version {version} unpacked");
                        Ok(())
                    }
                    Err(err) => {
                        log::error!(target: "assets", "Unpacking {version} failed: {err:#}");
                        Err(UnpackError { version, cause: Arc::new(err) })
                    }
                }
            }
            .boxed_local()
            .shared()
        };
        self.tasks.borrow_mut().insert(version.to_string(), task.clone());
        task
    }
}

fn settled(result: Result<(), UnpackError>) -> UnpackTask {
    future::ready(result).boxed_local().shared()
}

async fn unpack_version(
    paths: &AssetPaths,
    datagen: &DatagenConfig,
    generator: &dyn DataGenerator,
    version: &str,
) -> Result<()> {
    let staging = paths.staging_dir(version);
    if tokio::fs::try_exists(&staging).await.unwrap_or(false) {
        tokio::fs::remove_dir_all(&staging)
            .await
            .with_context(|| format!("Removing stale staging directory {}", staging.display()))?;
    }
    for sub in BUNDLE_SUBDIRS {
        let dir = staging.join(sub);
        tokio::fs::create_dir_all(&dir).await.with_context(|| format!("Creating directory {}", dir.display()))?;
    }

    let outcome = populate_bundle(paths, datagen, generator, version, &staging).await;
    if outcome.is_err() {
        if let Err(err) = tokio::fs::remove_dir_all(&staging).await {
            log::warn!(target: "assets", "Failed to clean {}: {err}", staging.display());
        }
    }
    outcome
}

async fn populate_bundle(
    paths: &AssetPaths,
    datagen: &DatagenConfig,
    generator: &dyn DataGenerator,
    version: &str,
    staging: &std::path::Path,
) -> Result<()> {
    let jar = paths.version_jar(version);
    let dest = staging.to_path_buf();
    let report = tokio::task::spawn_blocking(move || archive::extract_asset_subtrees(&jar, &dest))
        .await
        .context("Archive extraction task failed")??;
    log::info!(target: "assets", "Extracted {} files ({} bytes) for {version}", report.files, report.bytes);

    let invocation = GeneratorInvocation::for_version(paths, datagen, version, &staging.join("datagen"))?;
    generator.generate(&invocation).await?;

    let bundle = paths.bundle_dir(version);
    tokio::fs::rename(staging, &bundle)
        .await
        .with_context(|| format!("Publishing bundle {}", bundle.display()))?;
    Ok(())
}
