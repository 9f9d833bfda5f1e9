#[derive(thiserror::Error, Debug)]
pub enum Error<E> {
    #[error(transparent)]
    Store(E),

    #[error("cannot encode cache entry :: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("key '{0}' is reserved for tag versions")]
    ReservedKey(String),
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Error::Store(err)
    }
}
