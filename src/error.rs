//! Error types for the GSF codec adapter.
//!
//! Every failure the adapter can report to the host is a [`GsfError`]. The
//! host mixer additionally reads a per-thread "last error" string, which the
//! codec and track adapter keep up to date through [`set_last_error`].

use std::cell::RefCell;

/// Result type for GSF codec operations.
pub type Result<T> = std::result::Result<T, GsfError>;

/// Errors that can occur while loading the decoder or playing a track.
#[derive(thiserror::Error, Debug)]
pub enum GsfError {
    /// The decoder library could not be found or opened
    #[error("GSF decoder unavailable: {reason}")]
    LibraryUnavailable {
        /// Why no candidate library could be used
        reason: String,
    },

    /// The library was opened but a required entry point is missing
    #[error("GSF decoder is missing symbol `{symbol}`: {reason}")]
    MissingSymbol {
        /// Name of the unresolved symbol
        symbol: &'static str,
        /// Loader error text
        reason: String,
    },

    /// Allocation of a buffer, stream or transient block failed
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// The decoder rejected an operation and supplied a message
    #[error("GSF: {0}")]
    Decoder(String),

    /// No byte source (or an empty one) was handed to the codec
    #[error("GSF: Empty source given")]
    EmptySource,

    /// The extra argument string could not be interpreted
    #[error("GSF: Invalid arguments: {0}")]
    InvalidArgs(String),

    /// Sub-track index outside the image
    #[error("GSF: Invalid track index {index} (available: 0-{})", .available.saturating_sub(1))]
    InvalidTrack {
        /// Requested sub-track index
        index: usize,
        /// Number of sub-tracks in the image
        available: usize,
    },

    /// Format-conversion stream could not be built or fed
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// The host asked for an optional operation this codec does not provide
    #[error("GSF: {0} is not supported")]
    Unsupported(&'static str),

    /// IO error while reading the byte source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<String> for GsfError {
    /// Converts a decoder message into `GsfError::Decoder`.
    fn from(msg: String) -> Self {
        GsfError::Decoder(msg)
    }
}

impl From<&str> for GsfError {
    fn from(msg: &str) -> Self {
        GsfError::Decoder(msg.to_string())
    }
}

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Record `err` as the host-visible last error for this thread.
pub fn set_last_error(err: &GsfError) {
    let text = err.to_string();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(text));
}

/// Last error recorded on this thread, if any.
pub fn last_error() -> Option<String> {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

/// Forget the last recorded error.
pub fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

/// Records the error of a failed result before handing it back.
pub(crate) trait RecordError<T> {
    fn record(self) -> Result<T>;
}

impl<T> RecordError<T> for Result<T> {
    fn record(self) -> Result<T> {
        if let Err(err) = &self {
            set_last_error(err);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_error_roundtrip() {
        clear_last_error();
        assert!(last_error().is_none());

        set_last_error(&GsfError::EmptySource);
        assert_eq!(last_error().as_deref(), Some("GSF: Empty source given"));

        clear_last_error();
        assert!(last_error().is_none());
    }

    #[test]
    fn test_record_only_touches_errors() {
        clear_last_error();
        let ok: Result<u32> = Ok(3);
        assert_eq!(ok.record().unwrap(), 3);
        assert!(last_error().is_none());

        let err: Result<u32> = Err(GsfError::Decoder("bad header".into()));
        assert!(err.record().is_err());
        assert_eq!(last_error().as_deref(), Some("GSF: bad header"));
    }

    #[test]
    fn test_invalid_track_message() {
        let err = GsfError::InvalidTrack {
            index: 5,
            available: 3,
        };
        assert_eq!(err.to_string(), "GSF: Invalid track index 5 (available: 0-2)");
    }

    #[test]
    fn test_string_conversion_is_decoder_error() {
        let err: GsfError = "unsupported ROM".into();
        assert!(matches!(err, GsfError::Decoder(ref m) if m == "unsupported ROM"));
    }
}
