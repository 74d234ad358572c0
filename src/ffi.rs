//! Raw C ABI of libgsf.
//!
//! Functions that can fail return a `GsfError`, a pointer to a static,
//! NUL-terminated message that is null on success.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_long, c_short, c_void};

/// Opaque per-track emulator state.
#[repr(C)]
pub struct GsfEmu {
    _private: [u8; 0],
}

/// Tag block returned by `gsf_get_tags`, freed with `gsf_free_tags`.
#[repr(C)]
pub struct GsfTags {
    /// Track title
    pub title: *const c_char,
    /// Composer or artist
    pub artist: *const c_char,
    /// Game title
    pub game: *const c_char,
    /// Copyright line
    pub copyright: *const c_char,
}

/// Null on success, otherwise a static message.
pub type GsfError = *const c_char;

/// Interleaved channels in every buffer `gsf_play` fills.
pub const NATIVE_CHANNELS: usize = 2;

/// `gsf_new`: create an instance for a sample rate and sub-track.
pub type GsfNewFn =
    unsafe extern "C" fn(out: *mut *mut GsfEmu, sample_rate: c_int, flags: c_int) -> GsfError;
/// `gsf_load_file`: load an image from a path.
pub type GsfLoadFileFn = unsafe extern "C" fn(emu: *mut GsfEmu, filename: *const c_char) -> GsfError;
/// `gsf_load_data`: load an image from memory.
pub type GsfLoadDataFn =
    unsafe extern "C" fn(emu: *mut GsfEmu, data: *const c_void, size: usize) -> GsfError;
/// `gsf_num_channels`: number of sub-tracks.
pub type GsfNumChannelsFn = unsafe extern "C" fn(emu: *mut GsfEmu) -> c_int;
/// `gsf_sample_rate`: rate the instance renders at.
pub type GsfSampleRateFn = unsafe extern "C" fn(emu: *mut GsfEmu) -> c_int;
/// `gsf_ended`: whether playback reached the end.
pub type GsfEndedFn = unsafe extern "C" fn(emu: *const GsfEmu) -> bool;
/// `gsf_seek`: jump to a position in milliseconds.
pub type GsfSeekFn = unsafe extern "C" fn(emu: *mut GsfEmu, millis: c_long);
/// `gsf_tell`: position in milliseconds.
pub type GsfTellFn = unsafe extern "C" fn(emu: *const GsfEmu) -> c_long;
/// `gsf_play`: render interleaved stereo samples.
pub type GsfPlayFn = unsafe extern "C" fn(emu: *mut GsfEmu, out: *mut c_short, size: c_long) -> GsfError;
/// `gsf_get_tags`: allocate a tag block.
pub type GsfGetTagsFn = unsafe extern "C" fn(emu: *const GsfEmu, out: *mut *mut GsfTags) -> GsfError;
/// `gsf_free_tags`: release a tag block.
pub type GsfFreeTagsFn = unsafe extern "C" fn(tags: *mut GsfTags);
/// `gsf_default_length`: declared length in milliseconds, 0 if none.
pub type GsfDefaultLengthFn = unsafe extern "C" fn(emu: *const GsfEmu) -> c_long;
/// `gsf_delete`: destroy an instance.
pub type GsfDeleteFn = unsafe extern "C" fn(emu: *mut GsfEmu);

/// Symbol name of [`GsfNewFn`].
pub const SYM_NEW: &str = "gsf_new";
/// Symbol name of [`GsfLoadFileFn`].
pub const SYM_LOAD_FILE: &str = "gsf_load_file";
/// Symbol name of [`GsfLoadDataFn`].
pub const SYM_LOAD_DATA: &str = "gsf_load_data";
/// Symbol name of [`GsfNumChannelsFn`].
pub const SYM_NUM_CHANNELS: &str = "gsf_num_channels";
/// Symbol name of [`GsfSampleRateFn`].
pub const SYM_SAMPLE_RATE: &str = "gsf_sample_rate";
/// Symbol name of [`GsfEndedFn`].
pub const SYM_ENDED: &str = "gsf_ended";
/// Symbol name of [`GsfSeekFn`].
pub const SYM_SEEK: &str = "gsf_seek";
/// Symbol name of [`GsfTellFn`].
pub const SYM_TELL: &str = "gsf_tell";
/// Symbol name of [`GsfPlayFn`].
pub const SYM_PLAY: &str = "gsf_play";
/// Symbol name of [`GsfGetTagsFn`].
pub const SYM_GET_TAGS: &str = "gsf_get_tags";
/// Symbol name of [`GsfFreeTagsFn`].
pub const SYM_FREE_TAGS: &str = "gsf_free_tags";
/// Symbol name of [`GsfDefaultLengthFn`].
pub const SYM_DEFAULT_LENGTH: &str = "gsf_default_length";
/// Symbol name of [`GsfDeleteFn`].
pub const SYM_DELETE: &str = "gsf_delete";

/// One function pointer per libgsf entry point.
///
/// Only `load_data` is optional; older builds of the library can only load
/// from a path.
#[derive(Clone, Copy)]
pub struct GsfFunctions {
    /// `gsf_new`
    pub new: GsfNewFn,
    /// `gsf_load_file`
    pub load_file: GsfLoadFileFn,
    /// `gsf_load_data`, absent in older builds
    pub load_data: Option<GsfLoadDataFn>,
    /// `gsf_num_channels`
    pub num_channels: GsfNumChannelsFn,
    /// `gsf_sample_rate`
    pub sample_rate: GsfSampleRateFn,
    /// `gsf_ended`
    pub ended: GsfEndedFn,
    /// `gsf_seek`
    pub seek: GsfSeekFn,
    /// `gsf_tell`
    pub tell: GsfTellFn,
    /// `gsf_play`
    pub play: GsfPlayFn,
    /// `gsf_get_tags`
    pub get_tags: GsfGetTagsFn,
    /// `gsf_free_tags`
    pub free_tags: GsfFreeTagsFn,
    /// `gsf_default_length`
    pub default_length: GsfDefaultLengthFn,
    /// `gsf_delete`
    pub delete: GsfDeleteFn,
}

/// Message carried by a non-null `GsfError`.
///
/// # Safety
///
/// `err` must be null or point to a NUL-terminated string.
pub unsafe fn error_message(err: GsfError) -> Option<String> {
    owned_string(err)
}

/// Copy an optional C string.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
pub unsafe fn owned_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}
