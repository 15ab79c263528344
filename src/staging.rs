use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Files produced by a run, copied back when present.
pub const OUTPUT_SUFFIXES: [&str; 3] = ["QGIS_res", "post.msh", "post.res"];

/// Prepared input files of a simple-mode run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationInputs {
    pub top: PathBuf,
    pub pts: PathBuf,
    pub master: PathBuf,
    pub config: PathBuf,
}

impl SimulationInputs {
    /// 入力ファイルと作業ディレクトリ内での名前の対応
    fn targets(&self, name: &str) -> [(&Path, String); 4] {
        [
            (self.top.as_path(), format!("{}.top", name)),
            (self.pts.as_path(), format!("{}.pts", name)),
            (self.master.as_path(), format!("{}.MASTER.DAT", name)),
            (self.config.as_path(), format!("{}.DAT", name)),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        for path in [&self.top, &self.pts, &self.master, &self.config] {
            if !path.is_file() {
                return Err(Error::MissingFile(path.clone()));
            }
        }
        Ok(())
    }
}

/// Temporary working directory of one run, removed on drop unless kept.
#[derive(Debug)]
pub struct WorkDir {
    dir: TempDir,
}

impl WorkDir {
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("sph-").tempdir()?;
        debug!("Created working directory {:?}", dir.path());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Removes the directory, or leaves it on disk and returns its path.
    pub fn close(self, keep: bool) -> Result<Option<PathBuf>> {
        if keep {
            let path = self.dir.keep();
            info!("Keeping working directory {:?}", path);
            Ok(Some(path))
        } else {
            self.dir.close()?;
            Ok(None)
        }
    }
}

/// Copies the inputs into `work_dir` under the names the executable expects.
pub fn copy_inputs(name: &str, inputs: &SimulationInputs, work_dir: &Path) -> Result<()> {
    inputs.validate()?;
    for (source, target) in inputs.targets(name) {
        let destination = work_dir.join(&target);
        fs::copy(source, &destination)?;
        debug!("Copied {:?} -> {:?}", source, destination);
    }
    Ok(())
}

/// Copies the run's result files from `work_dir` into `output`.
pub fn copy_outputs(work_dir: &Path, name: &str, output: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output)?;

    let mut copied = Vec::new();
    for suffix in OUTPUT_SUFFIXES {
        let file_name = format!("{}.{}", name, suffix);
        let source = work_dir.join(&file_name);
        if source.exists() {
            let destination = output.join(&file_name);
            fs::copy(&source, &destination)?;
            copied.push(destination);
        } else {
            warn!("Expected output {:?} was not produced", source);
        }
    }

    info!("Copied {} output files to {:?}", copied.len(), output);
    Ok(copied)
}
