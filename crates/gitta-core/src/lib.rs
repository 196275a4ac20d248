pub mod activation;
pub mod cancel;
pub mod config;
pub mod doctor;
pub mod error;
pub mod folder;
pub mod idgen;
pub mod io;
pub mod lock;
pub mod paths;
pub mod pointer;
pub mod sprint;
pub mod status_file;
pub mod transition;
pub mod types;

pub use cancel::CancelToken;
pub use error::{ErrorKind, GittaError, Result};
