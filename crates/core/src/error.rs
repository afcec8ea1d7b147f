/// Errors raised while updating the running entity store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A `replace` directive needs an object body.
    #[error("could not replace entity store: expected a JSON object response body, got {actual}")]
    CouldNotReplaceStore { actual: String },

    /// A `merge` directive needs an object body, or a non-empty array whose
    /// first element is an object.
    #[error("could not merge entity store: {reason}")]
    CouldNotMergeStore { reason: String },
}
