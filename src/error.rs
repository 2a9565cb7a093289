use thiserror::Error;

/// Domain failures surfaced by the store, the filter form and the CLI.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("slug must be dash-joined [a-z0-9], got {0:?}")]
    InvalidSlug(String),

    #[error("slug {0} already exists")]
    SlugExists(String),

    #[error("post {0} not found")]
    PostNotFound(String),

    #[error("file name {0:?} must be a relative path inside the post directory")]
    UnsafeFileName(String),

    #[error("file {name} not found in post {slug}")]
    FileNotFound { slug: String, name: String },

    #[error("unknown filter field {0:?} (expected one of visible, index, tag, search, provide, page)")]
    UnknownFilterField(String),

    #[error("invalid creation date {0:?}, expected YYYY/MM/DD HH:MM")]
    InvalidTimestamp(String),

    #[error("expected FIELD=VALUE, got {0:?}")]
    MalformedAssignment(String),
}
