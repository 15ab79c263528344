use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{Launcher, SphConfig};
use crate::error::Result;

pub const FILES_NAME: &str = "files.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFiles {
    pub script: PathBuf,
    pub input: PathBuf,
}

/// Writes `files.txt` and the launch script into `work_dir`.
///
/// `files.txt` holds the problem name twice and is redirected into the
/// executable's stdin.
pub fn generate_batch_file(name: &str, work_dir: &Path, config: &SphConfig) -> Result<BatchFiles> {
    let input = work_dir.join(FILES_NAME);
    fs::write(&input, format!("{name}\n{name}\n"))?;

    let (script, contents) = match config.launcher {
        Launcher::Native => (
            work_dir.join(format!("{}.sh", name)),
            shell_script(work_dir, &config.executable),
        ),
        Launcher::Cmd | Launcher::Wine => (
            work_dir.join(format!("{}.bat", name)),
            batch_script(work_dir, &config.executable),
        ),
    };
    fs::write(&script, contents)?;

    debug!("Generated {:?} and {:?}", script, input);
    Ok(BatchFiles { script, input })
}

fn batch_script(work_dir: &Path, executable: &Path) -> String {
    format!(
        "set CWDIR=%~dp0\ncd {}\n{} < {}\ncd %WDIR%\n",
        work_dir.display(),
        executable.display(),
        FILES_NAME
    )
}

fn shell_script(work_dir: &Path, executable: &Path) -> String {
    format!(
        "#!/bin/sh\ncd \"{}\"\n\"{}\" < {}\n",
        work_dir.display(),
        executable.display(),
        FILES_NAME
    )
}
