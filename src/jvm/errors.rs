#[derive(Debug)]
pub enum Error {
    /// Underlying byte source could not be read
    IoError(std::io::Error),

    /// Class bytes do not form a well-formed class file
    BadClassFile(String),

    /// A descriptor or signature string failed to parse
    BadDescriptor(String),

    /// Requested method (name + descriptor) is absent from the class being
    /// loaded for inlining
    ///
    /// There is no valid fallback: the caller must abort the inlining attempt
    /// for that call site.
    MethodNotFound { name: String, descriptor: String },

    /// No class bytes could be located for an internal name
    ClassNotFound(String),

    /// A structural invariant was violated during surgery: an unmatched
    /// marker, an anchor that is not a member of the destination list, or a
    /// declaration context chain with no nameable owner
    ///
    /// Always fatal. This indicates a bug in upstream compilation, so the
    /// right response is to abort with the diagnostic, not to recover.
    InconsistentState(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}
