//! [`DecoderApi`] over the real libgsf function table.
//!
//! The table comes either from a shared object opened at runtime
//! ([`DynamicLoader`](crate::DynamicLoader)) or from symbols linked into the
//! binary (`StaticLoader`, feature `static-link`). In the first case the
//! `libloading::Library` is stored alongside the pointers so they never
//! outlive the mapping.

use crate::api::{DecoderApi, DecoderTags};
use crate::error::{GsfError, Result};
use crate::ffi::{self, GsfEmu, GsfFunctions, GsfTags};
use std::ffi::CString;
use std::io::Write;
use std::os::raw::{c_int, c_long, c_void};
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

/// Owned libgsf instance pointer.
#[derive(Debug)]
pub struct EmuPtr(NonNull<GsfEmu>);

// The emulator state has no thread affinity; it is only ever used by one
// track at a time.
unsafe impl Send for EmuPtr {}

impl EmuPtr {
    fn as_ptr(&self) -> *mut GsfEmu {
        self.0.as_ptr()
    }
}

/// libgsf entry points plus whatever keeps them valid.
pub struct NativeGsf {
    fns: GsfFunctions,
    origin: PathBuf,
    /// Dropped last: the function pointers point into this mapping.
    _lib: Option<libloading::Library>,
}

impl NativeGsf {
    /// Table resolved from a library opened at runtime.
    pub(crate) fn from_library(fns: GsfFunctions, lib: libloading::Library, origin: PathBuf) -> Self {
        Self {
            fns,
            origin,
            _lib: Some(lib),
        }
    }

    /// Table of symbols linked into the binary.
    #[cfg_attr(not(feature = "static-link"), allow(dead_code))]
    pub(crate) fn from_static(fns: GsfFunctions) -> Self {
        Self {
            fns,
            origin: PathBuf::from("<static>"),
            _lib: None,
        }
    }

    /// Where the entry points came from.
    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// Whether the library can load images straight from memory.
    pub fn has_memory_loader(&self) -> bool {
        self.fns.load_data.is_some()
    }

    fn check(err: ffi::GsfError) -> Result<()> {
        // SAFETY: libgsf returns null or a static NUL-terminated message.
        match unsafe { ffi::error_message(err) } {
            None => Ok(()),
            Some(msg) => Err(GsfError::Decoder(msg)),
        }
    }
}

impl DecoderApi for NativeGsf {
    type Emu = EmuPtr;

    fn new_emu(&self, sample_rate: u32, flags: i32) -> Result<EmuPtr> {
        let rate = c_int::try_from(sample_rate)
            .map_err(|_| GsfError::Decoder(format!("sample rate {sample_rate} out of range")))?;
        let mut out: *mut GsfEmu = ptr::null_mut();
        // SAFETY: `out` is a valid location for the new instance pointer.
        Self::check(unsafe { (self.fns.new)(&mut out, rate, flags as c_int) })?;
        NonNull::new(out)
            .map(EmuPtr)
            .ok_or_else(|| GsfError::OutOfMemory("gsf_new returned no instance".into()))
    }

    fn load_file(&self, emu: &mut EmuPtr, path: &Path) -> Result<()> {
        let path = path
            .to_str()
            .ok_or_else(|| GsfError::InvalidArgs(format!("non UTF-8 path {}", path.display())))?;
        let path = CString::new(path)
            .map_err(|_| GsfError::InvalidArgs("path contains a NUL byte".into()))?;
        // SAFETY: `emu` is live and `path` outlives the call.
        Self::check(unsafe { (self.fns.load_file)(emu.as_ptr(), path.as_ptr()) })
    }

    fn load_data(&self, emu: &mut EmuPtr, data: &[u8]) -> Result<()> {
        match self.fns.load_data {
            // SAFETY: the slice is valid for `data.len()` bytes during the call.
            Some(load) => Self::check(unsafe {
                load(emu.as_ptr(), data.as_ptr() as *const c_void, data.len())
            }),
            None => {
                let mut file = tempfile::Builder::new()
                    .prefix("gsf-")
                    .suffix(".minigsf")
                    .tempfile()?;
                file.write_all(data)?;
                file.flush()?;
                tracing::debug!(path = %file.path().display(), "spilled GSF image for path loader");
                self.load_file(emu, file.path())
            }
        }
    }

    fn num_channels(&self, emu: &EmuPtr) -> usize {
        // SAFETY: `emu` is live.
        let n = unsafe { (self.fns.num_channels)(emu.as_ptr()) };
        usize::try_from(n).unwrap_or(0)
    }

    fn sample_rate(&self, emu: &EmuPtr) -> u32 {
        // SAFETY: `emu` is live.
        let rate = unsafe { (self.fns.sample_rate)(emu.as_ptr()) };
        u32::try_from(rate).unwrap_or(0)
    }

    fn ended(&self, emu: &EmuPtr) -> bool {
        // SAFETY: `emu` is live.
        unsafe { (self.fns.ended)(emu.as_ptr()) }
    }

    fn seek(&self, emu: &mut EmuPtr, millis: u64) {
        let millis = c_long::try_from(millis).unwrap_or(c_long::MAX);
        // SAFETY: `emu` is live.
        unsafe { (self.fns.seek)(emu.as_ptr(), millis) }
    }

    fn tell(&self, emu: &EmuPtr) -> u64 {
        // SAFETY: `emu` is live.
        let millis = unsafe { (self.fns.tell)(emu.as_ptr()) };
        u64::try_from(millis).unwrap_or(0)
    }

    fn play(&self, emu: &mut EmuPtr, out: &mut [i16]) -> Result<()> {
        let len = c_long::try_from(out.len())
            .map_err(|_| GsfError::Decoder("render request too large".into()))?;
        // SAFETY: `out` is valid for `len` samples.
        Self::check(unsafe { (self.fns.play)(emu.as_ptr(), out.as_mut_ptr(), len) })
    }

    fn tags(&self, emu: &EmuPtr) -> Result<DecoderTags> {
        let mut raw: *mut GsfTags = ptr::null_mut();
        // SAFETY: `raw` is a valid out-pointer; `emu` is live.
        Self::check(unsafe { (self.fns.get_tags)(emu.as_ptr(), &mut raw) })?;
        if raw.is_null() {
            return Ok(DecoderTags::default());
        }
        // SAFETY: a successful gsf_get_tags leaves `raw` pointing at a tag
        // block we own until gsf_free_tags.
        let tags = unsafe {
            let block = &*raw;
            DecoderTags {
                title: ffi::owned_string(block.title),
                artist: ffi::owned_string(block.artist),
                game: ffi::owned_string(block.game),
                copyright: ffi::owned_string(block.copyright),
            }
        };
        // SAFETY: `raw` came from gsf_get_tags and is freed once.
        unsafe { (self.fns.free_tags)(raw) };
        Ok(tags)
    }

    fn default_length(&self, emu: &EmuPtr) -> Option<u32> {
        // SAFETY: `emu` is live.
        let millis = unsafe { (self.fns.default_length)(emu.as_ptr()) };
        u32::try_from(millis).ok().filter(|&ms| ms > 0)
    }

    fn delete(&self, emu: EmuPtr) {
        // SAFETY: ownership of the instance ends here.
        unsafe { (self.fns.delete)(emu.as_ptr()) }
    }
}
