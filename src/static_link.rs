//! libgsf linked at build time (feature `static-link`).

use crate::api::DecoderBackend;
use crate::error::Result;
use crate::ffi::{self, GsfEmu, GsfFunctions, GsfTags};
use crate::native::NativeGsf;
use std::os::raw::{c_char, c_int, c_long, c_short};

#[link(name = "gsf")]
extern "C" {
    fn gsf_new(out: *mut *mut GsfEmu, sample_rate: c_int, flags: c_int) -> ffi::GsfError;
    fn gsf_load_file(emu: *mut GsfEmu, filename: *const c_char) -> ffi::GsfError;
    fn gsf_num_channels(emu: *mut GsfEmu) -> c_int;
    fn gsf_sample_rate(emu: *mut GsfEmu) -> c_int;
    fn gsf_ended(emu: *const GsfEmu) -> bool;
    fn gsf_seek(emu: *mut GsfEmu, millis: c_long);
    fn gsf_tell(emu: *const GsfEmu) -> c_long;
    fn gsf_play(emu: *mut GsfEmu, out: *mut c_short, size: c_long) -> ffi::GsfError;
    fn gsf_get_tags(emu: *const GsfEmu, out: *mut *mut GsfTags) -> ffi::GsfError;
    fn gsf_free_tags(tags: *mut GsfTags);
    fn gsf_default_length(emu: *const GsfEmu) -> c_long;
    fn gsf_delete(emu: *mut GsfEmu);
}

/// Backend whose entry points are always present.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLoader;

impl DecoderBackend for StaticLoader {
    type Api = NativeGsf;

    fn open(&self) -> Result<NativeGsf> {
        tracing::info!("using statically linked libgsf");
        Ok(NativeGsf::from_static(GsfFunctions {
            new: gsf_new,
            load_file: gsf_load_file,
            load_data: None,
            num_channels: gsf_num_channels,
            sample_rate: gsf_sample_rate,
            ended: gsf_ended,
            seek: gsf_seek,
            tell: gsf_tell,
            play: gsf_play,
            get_tags: gsf_get_tags,
            free_tags: gsf_free_tags,
            default_length: gsf_default_length,
            delete: gsf_delete,
        }))
    }
}
