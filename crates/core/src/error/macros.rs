//! Error construction macros for noteweave-core

/// Bail with an IO error, capturing the path and the source error.
#[macro_export]
macro_rules! bail_io {
    ($path:expr, $source:expr) => {
        return Err($crate::error::NoteweaveError::io($path, $source))
    };
}

/// Bail with a parse error (degraded front-matter, unreadable wiki-link, etc).
#[macro_export]
macro_rules! bail_parse {
    ($path:expr, $msg:expr) => {
        return Err($crate::error::NoteweaveError::parse($path, $msg))
    };
}

/// Bail with an embedding-provider error.
#[macro_export]
macro_rules! bail_embedding {
    ($provider:expr, $msg:expr) => {
        return Err($crate::error::NoteweaveError::embedding($provider, $msg))
    };
}

/// Log (never bail) an invariant violation and skip the affected item.
#[macro_export]
macro_rules! warn_invariant {
    ($detail:expr) => {{
        let err = $crate::error::NoteweaveError::invariant($detail);
        tracing::error!(error = %err, "invariant violation");
        err
    }};
}
