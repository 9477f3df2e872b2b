//! Directory scanning tasks.
//!
//! `InitDirectoryData` seeds a workflow with a [`DirectoryData`] payload
//! describing a root directory and its filters. `ScanDirectoryData` rescans
//! that root on every tick and stores the matching files in the payload.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::Parser;
use glob::Pattern;
use tickflow_config::TaskSpec;
use tickflow_engine::{Task, TaskCore, TaskError};
use walkdir::WalkDir;

use crate::args::{parse_arguments, split_list};

/// A root directory, include/exclude filters and the last scan result.
///
/// Filters are glob patterns matched against a file's name or its path
/// relative to the root. An empty include list includes every file.
#[derive(Debug, Clone, Default)]
pub struct DirectoryData {
    root: PathBuf,
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    files: Vec<PathBuf>,
    last_scan: Option<DateTime<Utc>>,
}

fn compile(filters: &str) -> Result<Vec<Pattern>, glob::PatternError> {
    split_list(filters).iter().map(|f| Pattern::new(f)).collect()
}

impl DirectoryData {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Set the include filters from a `;`-separated glob list.
    pub fn with_include_filter(mut self, filters: &str) -> Result<Self, glob::PatternError> {
        self.include = compile(filters)?;
        Ok(self)
    }

    /// Set the exclude filters from a `;`-separated glob list.
    pub fn with_exclude_filter(mut self, filters: &str) -> Result<Self, glob::PatternError> {
        self.exclude = compile(filters)?;
        Ok(self)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files found by the last scan, sorted.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn last_scan(&self) -> Option<DateTime<Utc>> {
        self.last_scan
    }

    /// Whether a file at `relative` (to the root) passes the filters.
    pub fn matches(&self, relative: &Path) -> bool {
        let name = relative
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        let hit = |pattern: &Pattern| pattern.matches(&name) || pattern.matches_path(relative);
        let included = self.include.is_empty() || self.include.iter().any(hit);
        included && !self.exclude.iter().any(hit)
    }

    /// Walk the root recursively and replace the file list. Returns the
    /// number of files found.
    ///
    /// Entries that cannot be read are skipped.
    pub fn scan(&mut self) -> io::Result<usize> {
        if !self.root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {}", self.root.display()),
            ));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(root = %self.root.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            if self.matches(relative) {
                files.push(entry.into_path());
            }
        }
        files.sort();

        self.files = files;
        self.last_scan = Some(Utc::now());
        Ok(self.files.len())
    }
}

#[derive(Debug, Parser)]
#[command(no_binary_name = true)]
struct DirectoryArgs {
    /// Root directory
    #[arg(short = 'R', long = "root-dir", default_value = "")]
    root_dir: String,

    /// Include filter list
    #[arg(short = 'I', long = "include-filter", default_value = "")]
    include_filter: String,

    /// Exclude filter list
    #[arg(short = 'E', long = "exclude-filter", default_value = "")]
    exclude_filter: String,
}

impl DirectoryArgs {
    fn into_data(self) -> Result<DirectoryData, TaskError> {
        if self.root_dir.is_empty() {
            return Err(TaskError::InvalidArguments("the root directory is not defined".into()));
        }
        let invalid = |e: glob::PatternError| TaskError::InvalidArguments(format!("bad filter: {e}"));
        DirectoryData::new(&self.root_dir)
            .with_include_filter(&self.include_filter)
            .map_err(invalid)?
            .with_exclude_filter(&self.exclude_filter)
            .map_err(invalid)
    }
}

/// Puts a [`DirectoryData`] payload into its workflow when none is present.
pub struct InitDirectoryData {
    core: TaskCore,
    data: Option<DirectoryData>,
}

impl InitDirectoryData {
    pub fn new(spec: TaskSpec) -> Self {
        Self {
            core: TaskCore::new(spec),
            data: None,
        }
    }

    pub fn boxed(spec: &TaskSpec) -> Box<dyn Task> {
        Box::new(Self::new(spec.clone()))
    }

    fn configure(&mut self) -> Result<&DirectoryData, TaskError> {
        if self.data.is_none() {
            let data = parse_arguments::<DirectoryArgs>(self.core.spec())?.into_data()?;
            self.data = Some(data);
        }
        self.data
            .as_ref()
            .ok_or_else(|| TaskError::Failed("directory data not configured".into()))
    }
}

impl Task for InitDirectoryData {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_init(&mut self) -> Result<(), TaskError> {
        self.data = None;
        let data = self.configure()?;
        if !data.root().is_dir() {
            return Err(TaskError::InvalidArguments(format!(
                "the directory doesn't exist: {}",
                data.root().display()
            )));
        }
        Ok(())
    }

    /// Creates the payload on the first tick after init, not in init itself.
    fn on_tick(&mut self) -> Result<(), TaskError> {
        let workflow = self.core.owner()?;
        if workflow.data::<DirectoryData>().is_some() {
            return Ok(());
        }
        let data = self.configure()?.clone();
        tracing::debug!(task = %self.core.spec().name, root = %data.root().display(), "directory data created");
        workflow.init_data(data);
        Ok(())
    }
}

/// Rescans the workflow's [`DirectoryData`] on every tick.
pub struct ScanDirectoryData {
    core: TaskCore,
}

impl ScanDirectoryData {
    pub fn new(spec: TaskSpec) -> Self {
        Self {
            core: TaskCore::new(spec),
        }
    }

    pub fn boxed(spec: &TaskSpec) -> Box<dyn Task> {
        Box::new(Self::new(spec.clone()))
    }
}

impl Task for ScanDirectoryData {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_tick(&mut self) -> Result<(), TaskError> {
        let workflow = self.core.owner()?;
        let mut data = workflow
            .data::<DirectoryData>()
            .ok_or_else(|| TaskError::MissingData("no directory data in workflow".into()))?;
        let count = data.scan()?;
        tracing::trace!(task = %self.core.spec().name, root = %data.root().display(), files = count, "directory scanned");
        Ok(())
    }
}
