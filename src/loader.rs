//! Reference-counted decoder library handle.
//!
//! The host builds one [`DecoderLibrary`] at startup and hands it to every
//! track it opens. Each open track holds a [`LibraryLease`]; the first lease
//! resolves the decoder through the backend, and dropping the last one
//! unloads it again, so no function pointers stay reachable while nothing
//! uses them.

use crate::api::DecoderBackend;
use crate::error::Result;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

struct LoaderState<A> {
    consumers: usize,
    api: Option<Arc<A>>,
}

struct Shared<B: DecoderBackend> {
    backend: B,
    state: Mutex<LoaderState<B::Api>>,
}

/// Shared handle to the (possibly not yet loaded) decoder library.
///
/// Cloning the handle does not acquire the library.
pub struct DecoderLibrary<B: DecoderBackend> {
    shared: Arc<Shared<B>>,
}

impl<B: DecoderBackend> DecoderLibrary<B> {
    /// Unloaded handle that resolves the decoder through `backend`.
    pub fn new(backend: B) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                state: Mutex::new(LoaderState {
                    consumers: 0,
                    api: None,
                }),
            }),
        }
    }

    /// Register one more consumer, resolving the library if it is not loaded.
    ///
    /// On failure the loader state is left exactly as it was.
    pub fn acquire(&self) -> Result<LibraryLease<B>> {
        let mut state = self.shared.state.lock();
        let api = match &state.api {
            Some(api) => Arc::clone(api),
            None => {
                let api = Arc::new(self.shared.backend.open()?);
                state.api = Some(Arc::clone(&api));
                api
            }
        };
        state.consumers += 1;
        tracing::debug!(consumers = state.consumers, "decoder library acquired");
        Ok(LibraryLease {
            api,
            shared: Arc::clone(&self.shared),
        })
    }

    /// Whether the decoder is currently resolved.
    pub fn is_loaded(&self) -> bool {
        self.shared.state.lock().api.is_some()
    }

    /// Number of live leases.
    pub fn consumers(&self) -> usize {
        self.shared.state.lock().consumers
    }

    /// Backend used to resolve the decoder.
    pub fn backend(&self) -> &B {
        &self.shared.backend
    }
}

impl<B: DecoderBackend> Clone for DecoderLibrary<B> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<B: DecoderBackend> fmt::Debug for DecoderLibrary<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("DecoderLibrary")
            .field("loaded", &state.api.is_some())
            .field("consumers", &state.consumers)
            .finish()
    }
}

/// One consumer's claim on the loaded decoder. Dropping it releases the claim.
pub struct LibraryLease<B: DecoderBackend> {
    api: Arc<B::Api>,
    shared: Arc<Shared<B>>,
}

impl<B: DecoderBackend> LibraryLease<B> {
    /// The resolved decoder entry points.
    pub fn api(&self) -> &B::Api {
        &self.api
    }

    /// A handle to the library this lease belongs to.
    pub fn library(&self) -> DecoderLibrary<B> {
        DecoderLibrary {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<B: DecoderBackend> Drop for LibraryLease<B> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.consumers = state.consumers.saturating_sub(1);
        if state.consumers == 0 {
            state.api = None;
            tracing::info!("decoder library unloaded");
        } else {
            tracing::debug!(consumers = state.consumers, "decoder library released");
        }
    }
}

impl<B: DecoderBackend> fmt::Debug for LibraryLease<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryLease").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockConfig, MockLoader};

    #[test]
    fn test_first_acquire_loads_last_release_unloads() {
        let loader = MockLoader::new(MockConfig::default());
        let library = DecoderLibrary::new(loader.clone());
        assert!(!library.is_loaded());

        let a = library.acquire().unwrap();
        let b = library.acquire().unwrap();
        assert!(library.is_loaded());
        assert_eq!(library.consumers(), 2);
        assert_eq!(loader.opens(), 1);

        drop(a);
        assert!(library.is_loaded());
        assert_eq!(loader.closes(), 0);

        drop(b);
        assert!(!library.is_loaded());
        assert_eq!(library.consumers(), 0);
        assert_eq!(loader.closes(), 1);
    }

    #[test]
    fn test_failed_acquire_leaves_state_unchanged() {
        let loader = MockLoader::new(MockConfig {
            fail_open: true,
            ..MockConfig::default()
        });
        let library = DecoderLibrary::new(loader.clone());

        assert!(library.acquire().is_err());
        assert!(!library.is_loaded());
        assert_eq!(library.consumers(), 0);
        assert_eq!(loader.opens(), 0);
    }

    #[test]
    fn test_reload_after_full_release() {
        let loader = MockLoader::new(MockConfig::default());
        let library = DecoderLibrary::new(loader.clone());

        for _ in 0..3 {
            let lease = library.acquire().unwrap();
            assert_eq!(lease.library().consumers(), 1);
        }
        assert!(!library.is_loaded());
        assert_eq!(loader.opens(), 3);
        assert_eq!(loader.closes(), 3);
    }

    #[test]
    fn test_clone_shares_state() {
        let library = DecoderLibrary::new(MockLoader::new(MockConfig::default()));
        let other = library.clone();
        let _lease = other.acquire().unwrap();
        assert!(library.is_loaded());
        assert_eq!(library.consumers(), 1);
    }
}
