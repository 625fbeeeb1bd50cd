use std::future::Future;

/// Answers "is this full address already issued?".
///
/// # Contract
/// - An unknown address is `Ok(false)`, never an error
/// - `Err` is reserved for transport or infrastructure failure
/// - Must tolerate ~100 calls in quick succession
/// - Must not mutate the namespace it reads
pub trait ExistenceOracle: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Checks whether `address` (`local@domain`) is taken.
    fn exists(&self, address: &str) -> impl Future<Output = Result<bool, Self::Error>> + Send;
}

/// Adapts an async closure into an [`ExistenceOracle`].
///
/// ```
/// use std::convert::Infallible;
/// use staffmail::contracts::{ExistenceOracle, FnOracle};
///
/// let oracle = FnOracle::new(|addr: String| async move {
///     Ok::<_, Infallible>(addr.starts_with("jperez@"))
/// });
/// # let _ = &oracle;
/// ```
pub struct FnOracle<F> {
    f: F,
}

impl<F> FnOracle<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut, E> ExistenceOracle for FnOracle<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, E>> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    fn exists(&self, address: &str) -> impl Future<Output = Result<bool, E>> + Send {
        (self.f)(address.to_string())
    }
}

impl<O: ExistenceOracle> ExistenceOracle for std::sync::Arc<O> {
    type Error = O::Error;

    fn exists(&self, address: &str) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        (**self).exists(address)
    }
}
