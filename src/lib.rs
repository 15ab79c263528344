pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod grid;
pub mod model;
pub mod process;
pub mod pts;
pub mod reader;
pub mod res;
pub mod simulation;
pub mod staging;
pub mod text;
pub mod top;
pub mod writer;

pub use config::{Launcher, SphConfig};
pub use convert::{res_to_netcdf, res_to_rasters};
pub use error::{Error, Result};
pub use model::{Dem, GridGeometry, GridSeries, Quantity, TimeSlice, NODATA_VALUE};
pub use pts::points_to_pts;
pub use reader::HeightSource;
pub use res::EndOfFile;
pub use simulation::run_simple;
pub use staging::SimulationInputs;
pub use top::{dem_to_top, TopConfig};
pub use writer::{GeoTiffWriter, NetCdfWriter};
