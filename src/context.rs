//! The contract between the machine and the outside world: variable
//! resolution and cancellation.
//!
//! A [`Ctx`] is owned by a single evaluation. It binds the caller's
//! [`Selector`] (the only way the machine acquires variable values) with a
//! [`CancelToken`] the machine samples between nodes.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::value::Value;
use crate::DynError;

/// Compact integer handle for a variable, assigned at compile time.
///
/// Selectors backed by an array or a precomputed table can dispatch on the
/// key and ignore the name; name-keyed selectors like [`MapSelector`] do the
/// opposite. The machine always supplies both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectorKey(pub u16);

/// Resolves variable names to runtime values.
///
/// Returned values flow through [`unify`](crate::unify) unless they are
/// already canonical. A selector may block (e.g. perform I/O); evaluation
/// occupies the calling thread for the duration.
pub trait Selector {
    /// Look up one variable. `key` is the compile-time handle, `name` the
    /// source-level spelling.
    fn get(&self, key: SelectorKey, name: &str) -> Result<Value, DynError>;
}

/// Name-keyed selector over an owned map. The common case for tests, one-off
/// evaluations and small variable sets.
#[derive(Debug, Clone, Default)]
pub struct MapSelector {
    values: hashbrown::HashMap<String, Value>,
}

impl MapSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a variable.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for MapSelector {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Selector for MapSelector {
    fn get(&self, _key: SelectorKey, name: &str) -> Result<Value, DynError> {
        match self.values.get(name) {
            Some(v) => Ok(v.clone()),
            None => Err(Box::new(UnknownVariable {
                name: name.to_owned(),
            })),
        }
    }
}

/// Lookup failure reported by [`MapSelector`].
#[derive(Debug)]
pub struct UnknownVariable {
    pub name: String,
}

impl fmt::Display for UnknownVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variable '{}'", self.name)
    }
}

impl std::error::Error for UnknownVariable {}

/// Cooperative cancellation handle sampled by the machine between nodes.
///
/// Cloning shares the underlying flag, so a token handed to an evaluation on
/// another thread can be cancelled from the outside. A deadline, if set, is
/// checked at the same sampling points.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that trips once `timeout` has elapsed from now.
    pub fn with_deadline(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                deadline: Some(Instant::now() + timeout),
            }),
        }
    }

    /// Trip the token. All clones observe the cancellation.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::Relaxed) {
            return true;
        }
        match self.inner.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}

/// Everything one evaluation needs from its caller: the selector and the
/// cancellation token. Not reused across evaluations.
pub struct Ctx<'a> {
    selector: &'a dyn Selector,
    cancel: CancelToken,
}

impl<'a> Ctx<'a> {
    pub fn new(selector: &'a dyn Selector) -> Self {
        Self {
            selector,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(selector: &'a dyn Selector, cancel: CancelToken) -> Self {
        Self { selector, cancel }
    }

    /// Resolve one variable through the caller's selector.
    pub fn get(&self, key: SelectorKey, name: &str) -> Result<Value, DynError> {
        self.selector.get(key, name)
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
