use crate::loader::LoaderError;
#[cfg(feature = "plot")]
use crate::plot::ChartError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `loader` module")]
    Loader(#[from] LoaderError),
    #[cfg(feature = "plot")]
    #[error("Error in the `plot` module")]
    Chart(#[from] ChartError),
    #[error("Failed to write the CSV file")]
    Csv(#[from] csv::Error),
}
