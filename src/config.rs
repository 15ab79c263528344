use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;

pub const EXECUTABLE_ENV: &str = "SPH_EXECUTABLE";
pub const LAUNCHER_ENV: &str = "SPH_LAUNCHER";
pub const DEFAULT_EXECUTABLE: &str = "SPH24.exe";

/// How the generated script is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launcher {
    /// `sh <name>.sh`
    Native,
    /// `cmd.exe /c <name>.bat`
    Cmd,
    /// `wine cmd.exe /c <name>.bat`
    Wine,
}

impl Default for Launcher {
    fn default() -> Self {
        if cfg!(windows) {
            Launcher::Cmd
        } else {
            Launcher::Wine
        }
    }
}

impl FromStr for Launcher {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" | "sh" => Ok(Launcher::Native),
            "cmd" => Ok(Launcher::Cmd),
            "wine" => Ok(Launcher::Wine),
            other => Err(Error::InvalidInput(format!(
                "Unknown launcher '{}', expected native, cmd or wine",
                other
            ))),
        }
    }
}

/// Settings for running the SPH executable, passed explicitly to the batch
/// and process functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SphConfig {
    pub executable: PathBuf,
    pub launcher: Launcher,
    /// 実行後に作業ディレクトリを残す
    pub keep_work_dir: bool,
}

impl Default for SphConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            launcher: Launcher::default(),
            keep_work_dir: false,
        }
    }
}

impl SphConfig {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            ..Self::default()
        }
    }

    pub fn with_launcher(mut self, launcher: Launcher) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_keep_work_dir(mut self, keep: bool) -> Self {
        self.keep_work_dir = keep;
        self
    }

    /// Reads `SPH_EXECUTABLE` and `SPH_LAUNCHER`, falling back to defaults.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Self::default();
        if let Some(exe) = std::env::var_os(EXECUTABLE_ENV) {
            config.executable = PathBuf::from(exe);
        }
        if let Ok(launcher) = std::env::var(LAUNCHER_ENV) {
            config.launcher = launcher.parse()?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launcher_parsing() {
        assert_eq!("wine".parse::<Launcher>().unwrap(), Launcher::Wine);
        assert_eq!("CMD".parse::<Launcher>().unwrap(), Launcher::Cmd);
        assert_eq!("sh".parse::<Launcher>().unwrap(), Launcher::Native);
        assert!("bash".parse::<Launcher>().is_err());
    }

    #[test]
    fn test_builder() {
        let config = SphConfig::new("/opt/sph/sph24")
            .with_launcher(Launcher::Native)
            .with_keep_work_dir(true);
        assert_eq!(config.executable, PathBuf::from("/opt/sph/sph24"));
        assert_eq!(config.launcher, Launcher::Native);
        assert!(config.keep_work_dir);
    }
}
