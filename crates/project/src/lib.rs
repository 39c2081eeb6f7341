//! Project document and asset database.
//! The project file is an XML tree; `ProjectData` keeps an id- and
//! name-indexed registry of the assets it declares.

pub mod config;
pub mod database;
pub mod document;
pub mod error;

pub use config::WindowConfig;
pub use database::{AssetEntry, AssetId, AssetKind, ProjectData};
pub use document::{NodeId, XmlDocument, XmlError};
pub use error::{ProjectError, ProjectResult};
