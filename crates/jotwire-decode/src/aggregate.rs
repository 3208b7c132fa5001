//! Evaluate independent fallible computations without short-circuiting.
//!
//! Every computation runs. No failures yields all values; exactly one failure is
//! returned unchanged; two or more are wrapped in an [`AggregatedError`] through the
//! error type's [`Aggregate`] impl.

use std::fmt;

/// Two or more errors collected from independent computations, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedError<E> {
    errors: Vec<E>,
}

impl<E> AggregatedError<E> {
    /// Wrap `errors`. Returns `None` for an empty list.
    pub fn new(errors: Vec<E>) -> Option<Self> {
        if errors.is_empty() {
            return None;
        }
        Some(Self { errors })
    }

    pub fn errors(&self) -> &[E] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<E> {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.errors.iter()
    }
}

impl<E: fmt::Display> fmt::Display for AggregatedError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} errors: ", self.errors.len())?;
        for (idx, err) in self.errors.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for AggregatedError<E> {}

impl<'a, E> IntoIterator for &'a AggregatedError<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Error types that can absorb several of their own failures.
pub trait Aggregate: Sized {
    fn aggregate(errors: AggregatedError<Self>) -> Self;
}

/// Apply the single-versus-multiple policy to a list of collected failures.
pub fn combine<E: Aggregate>(mut errors: Vec<E>) -> Option<E> {
    match errors.len() {
        0 => None,
        1 => errors.pop(),
        _ => AggregatedError::new(errors).map(E::aggregate),
    }
}

/// Run every thunk and collect the results.
pub fn evaluate_all<T, E, I, F>(thunks: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Result<T, E>,
    E: Aggregate,
{
    map_all(thunks, |thunk| thunk())
}

/// Like `map`, but every element is visited and failures are combined.
pub fn map_all<I, T, U, E, F>(items: I, mut f: F) -> Result<Vec<U>, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Result<U, E>,
    E: Aggregate,
{
    let mut values = Vec::new();
    let mut errors = Vec::new();
    for item in items {
        match f(item) {
            Ok(value) => values.push(value),
            Err(err) => errors.push(err),
        }
    }
    match combine(errors) {
        Some(err) => Err(err),
        None => Ok(values),
    }
}

/// Tuple form of [`evaluate_all`] for thunks with different success types.
///
/// ```
/// use jotwire_decode::{EvaluateAll, ValidationError};
///
/// let (a, b) = (
///     || Ok::<_, ValidationError>(1),
///     || Ok::<_, ValidationError>("two"),
/// )
///     .evaluate_all()
///     .unwrap();
/// assert_eq!((a, b), (1, "two"));
/// ```
pub trait EvaluateAll {
    type Output;
    type Error;

    fn evaluate_all(self) -> Result<Self::Output, Self::Error>;
}

macro_rules! impl_evaluate_all {
    ($($thunk:ident $value:ident $slot:ident),+) => {
        impl<E, $($thunk, $value),+> EvaluateAll for ($($thunk,)+)
        where
            E: Aggregate,
            $($thunk: FnOnce() -> Result<$value, E>,)+
        {
            type Output = ($($value,)+);
            type Error = E;

            fn evaluate_all(self) -> Result<Self::Output, E> {
                let ($($slot,)+) = self;
                let mut errors = Vec::new();
                $(
                    let $slot = match $slot() {
                        Ok(value) => Some(value),
                        Err(err) => {
                            errors.push(err);
                            None
                        }
                    };
                )+
                if let Some(err) = combine(errors) {
                    return Err(err);
                }
                match ($($slot,)+) {
                    ($(Some($slot),)+) => Ok(($($slot,)+)),
                    _ => unreachable!("no failures were collected"),
                }
            }
        }
    };
}

impl_evaluate_all!(FA A a, FB B b);
impl_evaluate_all!(FA A a, FB B b, FC C c);
impl_evaluate_all!(FA A a, FB B b, FC C c, FD D d);
impl_evaluate_all!(FA A a, FB B b, FC C c, FD D d, FF F f);
impl_evaluate_all!(FA A a, FB B b, FC C c, FD D d, FF F f, FG G g);
