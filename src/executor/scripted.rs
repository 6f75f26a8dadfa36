//! Executor whose completions are driven by the test.

use parking_lot::Mutex;
use std::collections::HashSet;

use crate::executor::{CancellationToken, Completion, QueryExecutor};
use crate::types::{CachePolicy, Query, QueryError};

pub(crate) struct Call<T> {
    pub query: Query<&'static str>,
    pub token: CancellationToken,
    completion: Option<Completion<T>>,
}

pub(crate) struct ScriptedExecutor<T> {
    calls: Mutex<Vec<Call<T>>>,
    cached_skips: Mutex<HashSet<usize>>,
    reject_policies: bool,
}

impl<T: Clone + Send + Sync + 'static> ScriptedExecutor<T> {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            cached_skips: Mutex::new(HashSet::new()),
            reject_policies: false,
        }
    }

    /// Fail policy introspection like a local datastore would
    pub fn rejecting_policies() -> Self {
        Self {
            reject_policies: true,
            ..Self::new()
        }
    }

    pub fn mark_cached(&self, skip: usize) {
        self.cached_skips.lock().insert(skip);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn query(&self, index: usize) -> Query<&'static str> {
        self.calls.lock()[index].query.clone()
    }

    pub fn token(&self, index: usize) -> CancellationToken {
        self.calls.lock()[index].token.clone()
    }

    /// Invoke the completion of call `index` without holding the call list lock
    pub fn respond(&self, index: usize, result: std::result::Result<Vec<T>, QueryError>) {
        let mut completion = self.calls.lock()[index]
            .completion
            .take()
            .expect("completion already dropped");
        completion(result);
        self.calls.lock()[index].completion = Some(completion);
    }

    /// Drop the completion of call `index` without invoking it
    pub fn abandon(&self, index: usize) {
        let completion = self.calls.lock()[index].completion.take();
        drop(completion);
    }
}

impl<T: Clone + Send + Sync + 'static> QueryExecutor for ScriptedExecutor<T> {
    type Item = T;
    type Filter = &'static str;

    fn execute(
        &self,
        query: Query<&'static str>,
        token: CancellationToken,
        completion: Completion<T>,
    ) {
        self.calls.lock().push(Call {
            query,
            token,
            completion: Some(completion),
        });
    }

    fn has_cached_result(&self, query: &Query<&'static str>) -> bool {
        self.cached_skips.lock().contains(&query.skip())
    }

    fn resolve_cache_policy(
        &self,
        query: &Query<&'static str>,
    ) -> std::result::Result<CachePolicy, QueryError> {
        if self.reject_policies {
            return Err(QueryError::UnsupportedPolicy(query.cache_policy()));
        }
        Ok(query.cache_policy())
    }
}
