pub mod bloom;
pub mod canonical;
pub mod cli;
pub mod error;
pub mod file_io;
pub mod hash_functions;
pub mod params;
pub mod signature;
pub mod sketch;
pub mod sketcher;
