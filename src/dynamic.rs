//! libgsf resolved at runtime with `libloading`.

use crate::api::DecoderBackend;
use crate::config::LoaderConfig;
use crate::error::{GsfError, Result};
use crate::ffi::{self, GsfFunctions};
use crate::native::NativeGsf;
use libloading::Library;
use std::path::Path;

/// Backend that searches for libgsf on disk each time the library is
/// (re)acquired from an unloaded state.
#[derive(Debug, Clone, Default)]
pub struct DynamicLoader {
    config: LoaderConfig,
}

impl DynamicLoader {
    /// Loader searching the locations in `config`.
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Loader using the platform names and `GSF_LIBRARY_DIR`.
    pub fn from_env() -> Self {
        Self::new(LoaderConfig::from_env())
    }

    /// Search configuration in use.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Open one candidate and bind every required symbol.
    ///
    /// # Safety
    ///
    /// Opening a shared object runs its initialisers; `path` must name a
    /// trusted libgsf build.
    unsafe fn open_path(path: &Path) -> Result<NativeGsf> {
        let lib = Library::new(path).map_err(|e| GsfError::LibraryUnavailable {
            reason: format!("{}: {e}", path.display()),
        })?;
        let fns = resolve(&lib)?;
        Ok(NativeGsf::from_library(fns, lib, path.to_path_buf()))
    }
}

impl DecoderBackend for DynamicLoader {
    type Api = NativeGsf;

    fn open(&self) -> Result<NativeGsf> {
        let mut failures = Vec::new();
        for candidate in self.config.candidates() {
            // SAFETY: candidates come from the host's loader configuration.
            match unsafe { Self::open_path(&candidate) } {
                Ok(api) => {
                    tracing::info!(
                        path = %candidate.display(),
                        memory_loader = api.has_memory_loader(),
                        "libgsf loaded"
                    );
                    return Ok(api);
                }
                Err(err) => {
                    tracing::debug!(path = %candidate.display(), error = %err, "libgsf candidate rejected");
                    failures.push(err.to_string());
                }
            }
        }
        Err(GsfError::LibraryUnavailable {
            reason: if failures.is_empty() {
                "no candidate library names configured".to_string()
            } else {
                failures.join("; ")
            },
        })
    }
}

/// Copy one symbol out of `lib`.
///
/// # Safety
///
/// `T` must be the correct function pointer type for `name`.
unsafe fn symbol<T: Copy>(lib: &Library, name: &'static str) -> Result<T> {
    lib.get::<T>(name.as_bytes())
        .map(|sym| *sym)
        .map_err(|e| GsfError::MissingSymbol {
            symbol: name,
            reason: e.to_string(),
        })
}

/// Bind the whole table; nothing escapes unless every required symbol is found.
unsafe fn resolve(lib: &Library) -> Result<GsfFunctions> {
    Ok(GsfFunctions {
        new: symbol(lib, ffi::SYM_NEW)?,
        load_file: symbol(lib, ffi::SYM_LOAD_FILE)?,
        load_data: symbol(lib, ffi::SYM_LOAD_DATA).ok(),
        num_channels: symbol(lib, ffi::SYM_NUM_CHANNELS)?,
        sample_rate: symbol(lib, ffi::SYM_SAMPLE_RATE)?,
        ended: symbol(lib, ffi::SYM_ENDED)?,
        seek: symbol(lib, ffi::SYM_SEEK)?,
        tell: symbol(lib, ffi::SYM_TELL)?,
        play: symbol(lib, ffi::SYM_PLAY)?,
        get_tags: symbol(lib, ffi::SYM_GET_TAGS)?,
        free_tags: symbol(lib, ffi::SYM_FREE_TAGS)?,
        default_length: symbol(lib, ffi::SYM_DEFAULT_LENGTH)?,
        delete: symbol(lib, ffi::SYM_DELETE)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_library_is_unavailable() {
        let loader = DynamicLoader::new(LoaderConfig {
            search_dirs: vec![PathBuf::from("/nonexistent/gsf")],
            library_names: vec!["libgsf-definitely-missing.so".into()],
        });
        let err = match loader.open() {
            Err(err) => err,
            Ok(_) => panic!("a missing library must not load"),
        };
        assert!(matches!(err, GsfError::LibraryUnavailable { .. }));
        assert!(err.to_string().contains("libgsf-definitely-missing.so"));
    }

    #[test]
    fn test_empty_config_is_unavailable() {
        let loader = DynamicLoader::new(LoaderConfig {
            search_dirs: Vec::new(),
            library_names: Vec::new(),
        });
        assert!(matches!(
            loader.open(),
            Err(GsfError::LibraryUnavailable { .. })
        ));
    }
}
