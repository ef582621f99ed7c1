//! Derivatives sinks

mod filesystem;

pub use filesystem::FsDerivativesSink;
