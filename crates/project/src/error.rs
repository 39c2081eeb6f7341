use std::path::PathBuf;

use thiserror::Error;

use crate::document::XmlError;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("no project path given")]
    EmptyPath,
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("no asset named '{0}'")]
    AssetNotFound(String),
    #[error("an asset named '{0}' already exists")]
    NameTaken(String),
    #[error("project declares more than one asset named '{0}'")]
    DuplicateName(String),
    #[error("project document has no <{0}> element")]
    MissingElement(&'static str),
}

pub type ProjectResult<T> = Result<T, ProjectError>;
