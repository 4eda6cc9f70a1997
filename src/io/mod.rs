//! File input and output for the job.
//!
//! - [`glob`] -- resolve input arguments (files, directories, glob patterns).
//! - [`compression`] -- transparent decompression of compressed inputs.
//! - [`text`] -- line reading and `part-r-NNNNN` output directories.

pub mod compression;
pub mod glob;
pub mod text;

pub use glob::resolve_inputs;
pub use text::{InputLines, SUCCESS_MARKER, part_file_name, read_lines, write_partitions};
