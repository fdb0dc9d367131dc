use crate::feb;

/// Fatal generation errors
///
/// Problems in the source program are not errors in this sense: they are reported as
/// [`Diagnostic`](super::Diagnostic)s and generation carries on.
#[derive(Debug)]
pub enum Error {
    EntityGen(feb::Error),

    /// Source name can't be used as a function or field name
    MalformedName(String),
}

impl From<feb::Error> for Error {
    fn from(err: feb::Error) -> Error {
        Error::EntityGen(err)
    }
}
