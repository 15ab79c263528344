use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("netCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("{0:#}")]
    Output(#[from] anyhow::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("At least two points are required to estimate the grid spacing, got {0}")]
    TooFewPoints(usize),

    #[error("Feature {index} has no height value in field '{field}'")]
    MissingHeight { index: usize, field: String },

    #[error("Malformed result record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("Result file contains no time step")]
    EmptyResult,

    #[error(
        "Process \"{command}\" failed to start. Either \"{command}\" is missing, or you may have insufficient permissions to run the program."
    )]
    FailedToStart {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Process was unexpectedly terminated.")]
    ProcessCrashed,

    #[error("Process returned error code {0}")]
    ExitCode(i32),

    #[error("Input file not found: {0}")]
    MissingFile(PathBuf),
}
