use super::AssetPaths;
use crate::config::DatagenConfig;
use anyhow::{anyhow, bail, Context, Result};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

pub const REPORT_FLAG: &str = "--reports";
pub const OUTPUT_FLAG: &str = "--output";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    Osx,
    Linux,
}

impl OsFamily {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            OsFamily::Windows
        } else if cfg!(target_os = "macos") {
            OsFamily::Osx
        } else {
            OsFamily::Linux
        }
    }

    pub fn rule_name(self) -> &'static str {
        match self {
            OsFamily::Windows => "windows",
            OsFamily::Osx => "osx",
            OsFamily::Linux => "linux",
        }
    }

    pub fn classpath_separator(self) -> &'static str {
        match self {
            OsFamily::Windows => ";",
            OsFamily::Osx | OsFamily::Linux => ":",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VersionManifest {
    #[serde(default)]
    pub libraries: Vec<Library>,
}

#[derive(Debug, Deserialize)]
pub struct Library {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Vec<LibraryRule>,
}

#[derive(Debug, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<LibraryArtifact>,
}

#[derive(Debug, Deserialize)]
pub struct LibraryArtifact {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct LibraryRule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
}

impl Library {
    /// A library without rules is always on the classpath; otherwise the last matching rule wins.
    pub fn is_allowed(&self, os: OsFamily) -> bool {
        if self.rules.is_empty() {
            return true;
        }
        let mut allowed = false;
        for rule in &self.rules {
            let matches = match rule.os.as_ref().and_then(|os_rule| os_rule.name.as_deref()) {
                Some(name) => name == os.rule_name(),
                None => true,
            };
            if matches {
                allowed = rule.action == RuleAction::Allow;
            }
        }
        allowed
    }

    pub fn artifact_path(&self) -> Option<&str> {
        self.downloads.as_ref()?.artifact.as_ref().map(|artifact| artifact.path.as_str())
    }
}

impl VersionManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("Failed to read version manifest {}", path.display()))?;
        let manifest = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse version manifest {}", path.display()))?;
        Ok(manifest)
    }
}

/// Version jar first, then every library jar the OS rules admit, in manifest order.
pub fn build_classpath(paths: &AssetPaths, version: &str, os: OsFamily) -> Result<Vec<PathBuf>> {
    let manifest = VersionManifest::load(&paths.version_manifest(version))?;
    let libraries = paths.libraries_dir();
    let mut classpath = vec![paths.version_jar(version)];
    for library in &manifest.libraries {
        if !library.is_allowed(os) {
            continue;
        }
        match library.artifact_path() {
            Some(path) => classpath.push(libraries.join(path)),
            None => log::debug!(target: "datagen", "Library '{}' has no artifact, skipping", library.name),
        }
    }
    Ok(classpath)
}

pub fn join_classpath(entries: &[PathBuf], os: OsFamily) -> String {
    entries
        .iter()
        .map(|entry| entry.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(os.classpath_separator())
}

/// Everything needed to launch one data-generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorInvocation {
    pub version: String,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl GeneratorInvocation {
    pub fn for_version(
        paths: &AssetPaths,
        config: &DatagenConfig,
        version: &str,
        output_dir: &Path,
    ) -> Result<Self> {
        let os = OsFamily::current();
        let classpath = build_classpath(paths, version, os)?;
        Ok(Self {
            version: version.to_string(),
            program: config.java.clone(),
            args: vec![
                "-cp".to_string(),
                join_classpath(&classpath, os),
                config.main_class.clone(),
                REPORT_FLAG.to_string(),
                OUTPUT_FLAG.to_string(),
                output_dir.to_string_lossy().into_owned(),
            ],
            working_dir: output_dir.to_path_buf(),
        })
    }

    /// Where the generator drops the registry report inside its output directory.
    pub fn registries_report(&self) -> PathBuf {
        self.working_dir.join("reports").join("registries.json")
    }
}

pub trait DataGenerator {
    fn generate<'a>(&'a self, invocation: &'a GeneratorInvocation) -> LocalBoxFuture<'a, Result<()>>;
}

/// Runs the generator as a child process and forwards its output to the log.
#[derive(Debug, Default)]
pub struct JavaDataGenerator;

impl DataGenerator for JavaDataGenerator {
    fn generate<'a>(&'a self, invocation: &'a GeneratorInvocation) -> LocalBoxFuture<'a, Result<()>> {
        run_generator(invocation).boxed_local()
    }
}

async fn run_generator(invocation: &GeneratorInvocation) -> Result<()> {
    log::info!(target: "datagen", "Generating data for {} with {}", invocation.version, invocation.program);
    let mut child = Command::new(&invocation.program)
        .args(&invocation.args)
        .current_dir(&invocation.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn data generator '{}'", invocation.program))?;

    let stdout = child.stdout.take().ok_or_else(|| anyhow!("Failed to capture generator stdout"))?;
    let stderr = child.stderr.take().ok_or_else(|| anyhow!("Failed to capture generator stderr"))?;
    let version = invocation.version.as_str();
    let (_, _, status) = tokio::join!(
        forward_lines(stdout, version, log::Level::Info),
        forward_lines(stderr, version, log::Level::Warn),
        child.wait()
    );
    let status = status.context("Failed to wait for data generator")?;
    if !status.success() {
        bail!("Data generator for {} exited with {status}", invocation.version);
    }
    Ok(())
}

async fn forward_lines(stream: impl AsyncRead + Unpin, version: &str, level: log::Level) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => log::log!(target: "datagen", level, "[{version}] {line}"),
            Ok(None) => break,
            Err(err) => {
                log::warn!(target: "datagen", "[{version}] output stream error: {err}");
                break;
            }
        }
    }
}
