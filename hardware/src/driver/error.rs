use std::fmt::{Display, Formatter};

/// The error type returned by [`Provider`](crate::Provider), [`Node`](crate::Node),
/// [`PlayExecutor`](crate::PlayExecutor) and [`KnownHosts`](crate::KnownHosts) implementations.
#[derive(Debug)]
pub struct DriverError {
    /// Any message to be included with the error. This will be included in the formatted display
    /// before `inner`.
    context: Option<String>,

    /// The error that caused this error.
    inner: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

/// The result type returned by driver operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

impl DriverError {
    pub fn new_with_source_and_context<S, E>(context: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            context: Some(context.into()),
            inner: Some(source.into()),
        }
    }

    pub fn new_with_source<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            context: None,
            inner: Some(source.into()),
        }
    }

    pub fn new_with_context<S>(context: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            context: Some(context.into()),
            inner: None,
        }
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn inner(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.inner.as_ref().map(|some| some.as_ref())
    }
}

impl Display for DriverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.context(), self.inner()) {
            (Some(context), Some(inner)) => write!(f, "{}: {}", context, inner),
            (Some(context), None) => Display::fmt(context, f),
            (None, Some(inner)) => Display::fmt(inner, f),
            (None, None) => f.write_str("Unknown driver error"),
        }
    }
}

// Make `DriverError` function as a standard error.
impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// A trait that makes it possible to convert error types to `DriverError` using a familiar
/// `context` function.
///
/// # Example
///
/// ```
/// use testbed_hardware::{DriverResult, IntoDriverError};
///
/// fn read_address(path: &str) -> DriverResult<String> {
///     std::fs::read_to_string(path).context(format!("Unable to read '{}'", path))
/// }
///
/// assert!(read_address("/this/path/does/not/exist").is_err());
/// ```
pub trait IntoDriverError<T> {
    /// Convert `self` into a `DriverError`.
    fn context<S>(self, message: S) -> DriverResult<T>
    where
        S: Into<String>;
}

// Implement `IntoDriverError` for all standard `Error + Send + Sync + 'static` types.
impl<T, E> IntoDriverError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<S>(self, message: S) -> DriverResult<T>
    where
        S: Into<String>,
    {
        self.map_err(|e| DriverError::new_with_source_and_context(message, e))
    }
}

// Implement `IntoDriverError` for options where `None` is converted into an error.
impl<T> IntoDriverError<T> for std::option::Option<T> {
    fn context<S>(self, message: S) -> DriverResult<T>
    where
        S: Into<String>,
    {
        self.ok_or_else(|| DriverError::new_with_context(message))
    }
}
