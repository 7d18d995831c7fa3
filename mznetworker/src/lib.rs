mod args;
mod driver;
mod load;
mod progress;
mod write;

pub use args::*;
pub use driver::{MZNetworker, MZNetworkerError};
pub use load::{infer_table_format, read_features, read_mass_table, LoadError, TableFormat};
pub use write::{OutputDirectory, WriteError};
