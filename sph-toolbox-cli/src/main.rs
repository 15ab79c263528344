use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sph_toolbox::config::{EXECUTABLE_ENV, LAUNCHER_ENV};
use sph_toolbox::process::TracingFeedback;
use sph_toolbox::top::{CoordinateOrigin, RowOrder, TopFooter};
use sph_toolbox::{
    EndOfFile, HeightSource, Launcher, SimulationInputs, SphConfig, TopConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// DEMラスタを .top 形式に変換
    Dem2top {
        /// 入力ラスタ、またはラスタを含むディレクトリ
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// 出力ファイル（ディレクトリ入力の場合は出力ディレクトリ）
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,

        /// 並列処理スレッド数（デフォルト: CPUコア数）
        #[arg(short, long)]
        threads: Option<usize>,

        /// 南の行から出力
        #[arg(long)]
        south_to_north: bool,

        /// NoDataセルも出力
        #[arg(long)]
        keep_no_data: bool,

        /// フッタのラベル
        #[arg(long, value_enum, default_value_t = FooterArg::Terrain)]
        footer: FooterArg,

        /// 座標の原点（cell-centre: ラスタ座標、local-offset: 南西端を 0 とする）
        #[arg(long, value_enum, default_value_t = OriginArg::CellCentre)]
        origin: OriginArg,
    },

    /// 点レイヤを .pts 形式に変換
    Points2pts {
        /// 入力ベクタ（最初のレイヤを使用）
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// 高さを持つ属性フィールド
        #[arg(long, conflicts_with = "use_z", required_unless_present = "use_z")]
        field: Option<String>,

        /// ジオメトリのZ値を高さとして使用
        #[arg(long)]
        use_z: bool,

        /// 出力ファイル
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// 結果ファイル (.QGIS_res) を netCDF に変換
    Res2netcdf {
        #[arg(value_name = "RES")]
        input: PathBuf,

        /// グリッドを定義するDEM
        #[arg(long)]
        dem: PathBuf,

        /// 出力 .nc ファイル
        #[arg(short, long)]
        output: PathBuf,

        /// 最後のタイムステップを出力しない
        #[arg(long)]
        drop_last_step: bool,
    },

    /// 結果ファイル (.QGIS_res) を物理量ごとのGeoTIFFに変換
    Res2raster {
        #[arg(value_name = "RES")]
        input: PathBuf,

        /// グリッドを定義するDEM
        #[arg(long)]
        dem: PathBuf,

        /// 出力ディレクトリ
        #[arg(short, long)]
        output: PathBuf,

        /// 最後のタイムステップを出力しない
        #[arg(long)]
        drop_last_step: bool,
    },

    /// SPHモデルを実行（シンプルモード）
    Simulate {
        /// 問題名
        #[arg(long)]
        name: String,

        /// 全体問題ファイル (MASTER.DAT)
        #[arg(long)]
        master: PathBuf,

        /// 設定ファイル (.DAT)
        #[arg(long)]
        config: PathBuf,

        /// 点源ファイル (.pts)
        #[arg(long)]
        pts: PathBuf,

        /// 地形ファイル (.top)
        #[arg(long)]
        top: PathBuf,

        /// 出力ディレクトリ
        #[arg(short, long)]
        output: PathBuf,

        /// 指定すると結果を <name>.nc にも変換
        #[arg(long)]
        dem: Option<PathBuf>,

        #[command(flatten)]
        sph: SphArgs,
    },
}

#[derive(clap::Args, Debug)]
struct SphArgs {
    /// SPH実行ファイル
    #[arg(long, env = EXECUTABLE_ENV, default_value = sph_toolbox::config::DEFAULT_EXECUTABLE)]
    sph_executable: PathBuf,

    /// 起動方法
    #[arg(long, env = LAUNCHER_ENV, value_enum)]
    launcher: Option<LauncherArg>,

    /// 作業ディレクトリを削除しない
    #[arg(long)]
    keep_work_dir: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FooterArg {
    Terrain,
    TopoProps,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OriginArg {
    CellCentre,
    LocalOffset,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LauncherArg {
    Native,
    Cmd,
    Wine,
}

impl From<LauncherArg> for Launcher {
    fn from(arg: LauncherArg) -> Self {
        match arg {
            LauncherArg::Native => Launcher::Native,
            LauncherArg::Cmd => Launcher::Cmd,
            LauncherArg::Wine => Launcher::Wine,
        }
    }
}

fn main() -> Result<()> {
    // ログの初期化
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // CLI引数の解析
    let args = Args::parse();

    // 処理開始時間を記録
    let start_time = std::time::Instant::now();

    match args.command {
        Command::Dem2top {
            input,
            output,
            threads,
            south_to_north,
            keep_no_data,
            footer,
            origin,
        } => {
            let config = TopConfig {
                row_order: if south_to_north {
                    RowOrder::SouthToNorth
                } else {
                    RowOrder::NorthToSouth
                },
                skip_no_data: !keep_no_data,
                footer: match footer {
                    FooterArg::Terrain => TopFooter::Terrain,
                    FooterArg::TopoProps => TopFooter::TopoProps,
                },
                origin: match origin {
                    OriginArg::CellCentre => CoordinateOrigin::CellCentre,
                    OriginArg::LocalOffset => CoordinateOrigin::LocalOffset,
                },
            };

            // スレッドプールの設定
            if let Some(threads) = threads {
                ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build_global()
                    .context("Failed to build thread pool")?;
            }

            if input.is_file() {
                info!("Processing raster file: {:?}", input);
                sph_toolbox::dem_to_top(&input, &output, &config)?;
            } else if input.is_dir() {
                info!("Processing directory: {:?}", input);
                fs::create_dir_all(&output)?;
                process_directory(&input, &output, &config)?;
            } else {
                error!("Invalid input path: {:?}", input);
                anyhow::bail!("Input path must be a file or directory");
            }
        }
        Command::Points2pts {
            input,
            field,
            use_z,
            output,
        } => {
            let height = match field {
                Some(field) if !use_z => HeightSource::Field(field),
                _ => HeightSource::Z,
            };
            let count = sph_toolbox::points_to_pts(&input, &height, &output)?;
            info!("Written {} points: {:?}", count, output);
        }
        Command::Res2netcdf {
            input,
            dem,
            output,
            drop_last_step,
        } => {
            sph_toolbox::res_to_netcdf(&input, &dem, &output, end_of_file(drop_last_step))?;
            info!("Written netCDF: {:?}", output);
        }
        Command::Res2raster {
            input,
            dem,
            output,
            drop_last_step,
        } => {
            let paths =
                sph_toolbox::res_to_rasters(&input, &dem, &output, end_of_file(drop_last_step))?;
            for path in paths {
                info!("Written GeoTIFF: {:?}", path);
            }
        }
        Command::Simulate {
            name,
            master,
            config,
            pts,
            top,
            output,
            dem,
            sph,
        } => {
            let inputs = SimulationInputs {
                top,
                pts,
                master,
                config,
            };
            let mut sph_config =
                SphConfig::new(sph.sph_executable).with_keep_work_dir(sph.keep_work_dir);
            if let Some(launcher) = sph.launcher {
                sph_config = sph_config.with_launcher(launcher.into());
            }

            let feedback = TracingFeedback::new();
            let result = sph_toolbox::run_simple(&name, &inputs, &output, &sph_config, &feedback)?;

            if let Some(dem) = dem {
                let nc_path = output.join(format!("{}.nc", name));
                sph_toolbox::res_to_netcdf(
                    &result.result_file,
                    &dem,
                    &nc_path,
                    EndOfFile::default(),
                )?;
                info!("Written netCDF: {:?}", nc_path);
            }
        }
    }

    // 処理時間を表示
    let elapsed = start_time.elapsed();
    info!("Total processing time: {:?}", elapsed);

    Ok(())
}

fn end_of_file(drop_last_step: bool) -> EndOfFile {
    if drop_last_step {
        EndOfFile::Drop
    } else {
        EndOfFile::Flush
    }
}

fn process_directory(dir: &Path, output: &Path, config: &TopConfig) -> Result<()> {
    use rayon::prelude::*;

    // ラスタファイルを再帰的に収集
    let input_files = collect_raster_files(dir)?;
    info!("Found {} raster files", input_files.len());

    // 並列処理でファイルを変換
    let results: Vec<sph_toolbox::Result<usize>> = input_files
        .par_iter()
        .map(|path| {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("dem");
            let output_path = output.join(format!("{}.top", stem));
            sph_toolbox::dem_to_top(path, &output_path, config)
        })
        .collect();

    // エラーをチェック
    let mut errors = Vec::new();
    for (i, result) in results.into_iter().enumerate() {
        if let Err(e) = result {
            errors.push(format!("{}: {}", input_files[i].display(), e));
        }
    }

    if !errors.is_empty() {
        error!("Failed to process {} files:", errors.len());
        for err in &errors {
            error!("  {}", err);
        }
        anyhow::bail!("{} files failed to process", errors.len());
    }

    Ok(())
}

fn collect_raster_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            // サブディレクトリを再帰的に探索
            files.extend(collect_raster_files(&path)?);
        } else if is_raster(&path) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn is_raster(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .as_deref(),
        Some("tif" | "tiff" | "asc" | "img" | "vrt")
    )
}
