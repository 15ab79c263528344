use std::path::{Path, PathBuf};

use tracing::info;

use crate::batch::generate_batch_file;
use crate::config::SphConfig;
use crate::error::Result;
use crate::process::{execute, launch_command, Feedback};
use crate::staging::{copy_inputs, copy_outputs, SimulationInputs, WorkDir};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationOutput {
    pub output_dir: PathBuf,
    /// `<name>.QGIS_res` in the output directory
    pub result_file: PathBuf,
    pub copied: Vec<PathBuf>,
    pub work_dir: Option<PathBuf>,
}

/// Runs the SPH model on prepared inputs ("simple mode").
///
/// Stages the inputs in a fresh working directory, writes the batch files,
/// blocks on the executable and copies the results into `output_dir`.
pub fn run_simple(
    name: &str,
    inputs: &SimulationInputs,
    output_dir: &Path,
    config: &SphConfig,
    feedback: &dyn Feedback,
) -> Result<SimulationOutput> {
    inputs.validate()?;

    feedback.push_info("Preparing inputs…");
    let work_dir = WorkDir::create()?;
    copy_inputs(name, inputs, work_dir.path())?;
    let files = generate_batch_file(name, work_dir.path(), config)?;

    feedback.push_info("Running SPH model…");
    execute(launch_command(&files, work_dir.path(), config), feedback)?;

    feedback.push_info("Copying output files…");
    let copied = copy_outputs(work_dir.path(), name, output_dir)?;

    feedback.push_info("Cleanup…");
    let kept = work_dir.close(config.keep_work_dir)?;

    info!("Simulation '{}' finished", name);
    Ok(SimulationOutput {
        output_dir: output_dir.to_path_buf(),
        result_file: output_dir.join(format!("{}.QGIS_res", name)),
        copied,
        work_dir: kept,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::Launcher;
    use crate::process::TracingFeedback;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn test_run_simple_with_fake_executable() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        // stdin から問題名を読み、結果ファイルを書く偽の実行ファイル
        let exe = root.join("fake_sph.sh");
        fs::write(
            &exe,
            "#!/bin/sh\nread name\nprintf 'time 0.0\\n1 2 3 4 5 6\\n' > \"$name.QGIS_res\"\necho \"50 %\"\necho done\n",
        )
        .unwrap();
        fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();

        let inputs = SimulationInputs {
            top: root.join("a.top"),
            pts: root.join("a.pts"),
            master: root.join("a.master.dat"),
            config: root.join("a.dat"),
        };
        for path in [&inputs.top, &inputs.pts, &inputs.master, &inputs.config] {
            fs::write(path, "x").unwrap();
        }

        let config = SphConfig::new(&exe).with_launcher(Launcher::Native);
        let output_dir = root.join("out");
        let output = run_simple(
            "frank",
            &inputs,
            &output_dir,
            &config,
            &TracingFeedback::new(),
        )
        .unwrap();

        assert!(output.result_file.exists());
        assert_eq!(output.copied.len(), 1);
        assert!(output.work_dir.is_none());
        assert!(fs::read_to_string(&output.result_file)
            .unwrap()
            .starts_with("time 0.0"));
    }
}
