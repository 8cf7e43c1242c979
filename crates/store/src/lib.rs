//! Component stores for canopy projects.
//!
//! ## Available Stores
//!
//! - [`FilesystemComponentStore`]: loads one JSON file per component from a
//!   project directory
//! - [`ProjectFile`]: a whole project in one JSON document, loaded into an
//!   [`InMemoryComponentStore`]
//!
//! ## Re-exports
//!
//! For convenience, the in-memory store from canopy-traits is re-exported.

mod filesystem;
mod project;

pub use filesystem::FilesystemComponentStore;
pub use project::{PackageFile, ProjectFile};

pub use canopy_traits::InMemoryComponentStore;
