pub mod executable;
pub mod utils;

pub use executable::install_from;
