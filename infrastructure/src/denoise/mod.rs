//! External denoising tool adapter

mod command;

pub use command::CommandDenoiser;
