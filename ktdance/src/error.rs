use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "{}read of {len} bytes at offset {offset:#x} runs past the end of the buffer ({size} bytes)",
        prefix(.context)
    )]
    OutOfBounds {
        context: Option<String>,
        offset: usize,
        len: usize,
        size: usize,
    },

    #[error("{context} at offset {offset:#x}: {message}")]
    StructuralMismatch {
        context: String,
        offset: usize,
        message: String,
    },

    #[error("bone {bone} references parent {parent} outside a skeleton of {count} bones")]
    InvalidParent {
        bone: usize,
        parent: i64,
        count: usize,
    },

    #[error("bone hierarchy contains a cycle through bone {bone}")]
    CyclicHierarchy { bone: usize },

    #[error("failed to parse archive: {message}")]
    ArchiveParse { message: String },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn structural(
        context: impl Into<String>,
        offset: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::StructuralMismatch {
            context: context.into(),
            offset,
            message: message.into(),
        }
    }

    /// Labels a bounds failure with the decode step that triggered it. The innermost label wins.
    pub(crate) fn within(self, context: impl FnOnce() -> String) -> Self {
        match self {
            Self::OutOfBounds {
                context: None,
                offset,
                len,
                size,
            } => Self::OutOfBounds {
                context: Some(context()),
                offset,
                len,
                size,
            },
            other => other,
        }
    }
}

fn prefix(context: &Option<String>) -> String {
    context
        .as_deref()
        .map(|c| format!("{c}: "))
        .unwrap_or_default()
}

pub(crate) trait ResultExt<T> {
    fn within(self, context: impl FnOnce() -> String) -> Result<T, Error>;
}

impl<T> ResultExt<T> for Result<T, Error> {
    fn within(self, context: impl FnOnce() -> String) -> Result<T, Error> {
        self.map_err(|e| e.within(context))
    }
}
