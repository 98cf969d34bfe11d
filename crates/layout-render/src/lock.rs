//! Guards around the shared compiled template set.
//!
//! The coordinator holds its [`TemplateSet`] behind a [`SetGuard`], chosen
//! once at construction by [`select_guard`]:
//!
//! | development mode | mutex lock | guard |
//! |------------------|------------|-------|
//! | on | any | [`LockedSet`] |
//! | off | on | [`LockedSet`] |
//! | off | off | [`LocklessSet`] |
//!
//! [`LockedSet`] serialises compilation behind the write side of an
//! `RwLock`; readers clone the `Arc` under the read side and execute without
//! holding the lock. [`LocklessSet`] keeps the set in an atomically swapped
//! slot: reads are a plain atomic load and a recompile publishes a whole new
//! set with one store.

use std::sync::{Arc, PoisonError, RwLock};

use arc_swap::ArcSwapOption;

use crate::error::Result;
use crate::template::TemplateSet;

/// Builds a fresh template set. Called by the guard at most once per compile.
pub type Build<'a> = &'a dyn Fn() -> Result<TemplateSet>;

/// Strategy protecting the compiled template set.
pub trait SetGuard: Send + Sync {
    /// Returns the published set, if one has been compiled.
    fn load(&self) -> Option<Arc<TemplateSet>>;

    /// Returns the published set, compiling it with `build` when none is held.
    ///
    /// Concurrent callers observe a single compile.
    fn get_or_compile(&self, build: Build<'_>) -> Result<Arc<TemplateSet>>;

    /// Discards any held set and compiles a new one.
    ///
    /// On failure no set is held afterwards.
    fn recompile(&self, build: Build<'_>) -> Result<Arc<TemplateSet>>;

    /// Whether this guard performs real mutual exclusion.
    fn is_locking(&self) -> bool;
}

/// Picks the guard for the given configuration.
///
/// Development mode always forces the locking guard.
pub fn select_guard(is_development: bool, use_mutex_lock: bool) -> Box<dyn SetGuard> {
    if is_development || use_mutex_lock {
        Box::new(LockedSet::default())
    } else {
        Box::new(LocklessSet::default())
    }
}

/// Read/write locked template set.
#[derive(Debug, Default)]
pub struct LockedSet {
    inner: RwLock<Option<Arc<TemplateSet>>>,
}

impl SetGuard for LockedSet {
    fn load(&self) -> Option<Arc<TemplateSet>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn get_or_compile(&self, build: Build<'_>) -> Result<Arc<TemplateSet>> {
        if let Some(set) = self.load() {
            return Ok(set);
        }

        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have compiled while we waited for the write side.
        if let Some(set) = slot.as_ref() {
            return Ok(Arc::clone(set));
        }
        let set = Arc::new(build()?);
        *slot = Some(Arc::clone(&set));
        Ok(set)
    }

    fn recompile(&self, build: Build<'_>) -> Result<Arc<TemplateSet>> {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
        let set = Arc::new(build()?);
        *slot = Some(Arc::clone(&set));
        Ok(set)
    }

    fn is_locking(&self) -> bool {
        true
    }
}

/// Template set published as an atomically swapped snapshot.
///
/// Readers load the current `Arc` without taking a lock. A recompile builds
/// the new set off to the side and publishes it with a single store, so
/// readers never wait on a filesystem walk.
#[derive(Debug, Default)]
pub struct LocklessSet {
    current: ArcSwapOption<TemplateSet>,
}

impl SetGuard for LocklessSet {
    fn load(&self) -> Option<Arc<TemplateSet>> {
        self.current.load_full()
    }

    fn get_or_compile(&self, build: Build<'_>) -> Result<Arc<TemplateSet>> {
        if let Some(set) = self.load() {
            return Ok(set);
        }

        // Racing first callers may each build; the first published set wins.
        let built = Arc::new(build()?);
        let previous = self
            .current
            .rcu(|current| current.clone().or_else(|| Some(Arc::clone(&built))));
        Ok(previous.unwrap_or(built))
    }

    fn recompile(&self, build: Build<'_>) -> Result<Arc<TemplateSet>> {
        match build() {
            Ok(set) => {
                let set = Arc::new(set);
                self.current.store(Some(Arc::clone(&set)));
                Ok(set)
            }
            Err(err) => {
                self.current.store(None);
                Err(err)
            }
        }
    }

    fn is_locking(&self) -> bool {
        false
    }
}
