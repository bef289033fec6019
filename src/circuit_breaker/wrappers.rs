//! Binding of a dependency handle to its circuit breaker.

use crate::circuit_breaker::{BreakerStatus, CircuitBreaker, ExecuteError};
use std::future::Future;
use std::sync::Arc;

/// A dependency client paired with the breaker that guards it.
///
/// Calls go through [`ProtectedDependency::execute`], which hands the
/// operation a reference to the client.
#[derive(Debug)]
pub struct ProtectedDependency<S> {
    dependency: S,
    breaker: Arc<CircuitBreaker>,
}

impl<S> ProtectedDependency<S> {
    pub fn new(dependency: S, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            dependency,
            breaker,
        }
    }

    /// Get the underlying client
    pub fn inner(&self) -> &S {
        &self.dependency
    }

    /// Get the circuit breaker
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn status(&self) -> BreakerStatus {
        self.breaker.status()
    }

    /// Run `operation` against the client with circuit breaker protection
    pub async fn execute<'a, F, Fut, T, E>(&'a self, operation: F) -> Result<T, ExecuteError<E>>
    where
        F: FnOnce(&'a S) -> Fut,
        Fut: Future<Output = Result<T, E>> + 'a,
    {
        let dependency = &self.dependency;
        self.breaker.execute(|| operation(dependency)).await
    }
}

impl<S: Clone> Clone for ProtectedDependency<S> {
    fn clone(&self) -> Self {
        Self {
            dependency: self.dependency.clone(),
            breaker: self.breaker.clone(),
        }
    }
}
