//! GSF codec registration object.
//!
//! [`GsfCodec`] is what the host mixer registers: it describes the codec,
//! lets the host pin the decoder library with [`load`](MusicCodec::load) /
//! [`unload`](MusicCodec::unload), and opens [`GsfMusic`] tracks.

use crate::api::DecoderBackend;
use crate::config::OutputSpec;
use crate::dynamic::DynamicLoader;
use crate::error::{GsfError, RecordError, Result};
use crate::gsf_music::GsfMusic;
use crate::loader::{DecoderLibrary, LibraryLease};
use crate::music::{MusicCaps, MusicCodec, MusicInterfaceInfo, MusicType};
use parking_lot::Mutex;
use std::io::{Read, Seek};

/// Registration entry for the GSF codec.
pub const INFO: MusicInterfaceInfo = MusicInterfaceInfo {
    tag: "GSF",
    music_type: MusicType::Gsf,
    api: "libgsf",
    capabilities: MusicCaps::VOLUME
        .union(MusicCaps::SEEK)
        .union(MusicCaps::TELL)
        .union(MusicCaps::DURATION)
        .union(MusicCaps::META_TAGS)
        .union(MusicCaps::TRACKS),
};

/// GSF codec bound to one decoder library and output format.
pub struct GsfCodec<B: DecoderBackend> {
    library: DecoderLibrary<B>,
    spec: OutputSpec,
    /// Leases taken by [`MusicCodec::load`]
    host_leases: Mutex<Vec<LibraryLease<B>>>,
}

impl<B: DecoderBackend> GsfCodec<B> {
    /// Codec opening tracks from `library` and rendering them to `spec`.
    pub fn new(library: DecoderLibrary<B>, spec: OutputSpec) -> Self {
        Self {
            library,
            spec,
            host_leases: Mutex::new(Vec::new()),
        }
    }

    /// Library handle shared by every track this codec opens.
    pub fn library(&self) -> &DecoderLibrary<B> {
        &self.library
    }

    /// Output format handed to new tracks.
    pub fn output_spec(&self) -> &OutputSpec {
        &self.spec
    }
}

impl GsfCodec<DynamicLoader> {
    /// Codec resolving libgsf from the locations in the environment.
    pub fn from_env(spec: OutputSpec) -> Self {
        Self::new(DecoderLibrary::new(DynamicLoader::from_env()), spec)
    }
}

impl<B: DecoderBackend> MusicCodec for GsfCodec<B> {
    type Music = GsfMusic<B>;

    fn info(&self) -> &MusicInterfaceInfo {
        &INFO
    }

    fn load(&self) -> Result<()> {
        let lease = self.library.acquire().record()?;
        self.host_leases.lock().push(lease);
        Ok(())
    }

    fn unload(&self) {
        // Extra unloads are ignored.
        let lease = self.host_leases.lock().pop();
        drop(lease);
    }

    fn create_from_reader_ex<R: Read + Seek>(
        &self,
        src: Option<R>,
        args: Option<&str>,
    ) -> Result<GsfMusic<B>> {
        let src = src.ok_or(GsfError::EmptySource).record()?;
        let lease = self.library.acquire().record()?;
        GsfMusic::new(lease, self.spec, src, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoaderConfig;
    use crate::error::{clear_last_error, last_error};
    use crate::metadata::MetaTag;
    use crate::mock::{mock_image, MockConfig, MockLoader};
    use crate::music::MusicStream;
    use std::io::Cursor;

    fn codec(config: MockConfig) -> (MockLoader, GsfCodec<MockLoader>) {
        let loader = MockLoader::new(config);
        let codec = GsfCodec::new(
            DecoderLibrary::new(loader.clone()),
            OutputSpec::new(8_000).samples(256),
        );
        (loader, codec)
    }

    #[test]
    fn test_missing_source_sets_error_and_loads_nothing() {
        let (loader, codec) = codec(MockConfig::default());
        clear_last_error();

        let result = codec.create_from_reader(None::<Cursor<Vec<u8>>>);
        assert!(matches!(result, Err(GsfError::EmptySource)));
        assert_eq!(last_error().as_deref(), Some("GSF: Empty source given"));
        assert_eq!(loader.opens(), 0);
        assert!(!codec.library().is_loaded());
    }

    #[test]
    fn test_open_and_close_track() -> anyhow::Result<()> {
        let (loader, codec) = codec(MockConfig::default());
        let music = codec.create_from_reader(Some(Cursor::new(mock_image())))?;
        assert_eq!(music.meta_tag(MetaTag::Title), "Mock Title");
        assert_eq!(codec.library().consumers(), 1);

        drop(music);
        assert!(!codec.library().is_loaded());
        assert_eq!(loader.live_emus(), 0);
        Ok(())
    }

    #[test]
    fn test_host_load_keeps_library_resident() {
        let (loader, codec) = codec(MockConfig::default());
        codec.load().unwrap();

        let music = codec
            .create_from_reader_ex(Some(Cursor::new(mock_image())), Some("0"))
            .unwrap();
        drop(music);
        assert!(codec.library().is_loaded());
        assert_eq!(loader.opens(), 1);

        codec.unload();
        assert!(!codec.library().is_loaded());
        assert_eq!(loader.closes(), 1);

        codec.unload();
        assert_eq!(codec.library().consumers(), 0);
    }

    #[test]
    fn test_unavailable_library_fails_cleanly() {
        let (_loader, codec) = codec(MockConfig {
            fail_open: true,
            ..MockConfig::default()
        });
        assert!(matches!(codec.load(), Err(GsfError::LibraryUnavailable { .. })));
        let result = codec.create_from_reader(Some(Cursor::new(mock_image())));
        assert!(matches!(result, Err(GsfError::LibraryUnavailable { .. })));
        assert!(last_error().is_some());
        assert_eq!(codec.library().consumers(), 0);
    }

    #[test]
    fn test_dynamic_codec_without_library() {
        let loader = DynamicLoader::new(LoaderConfig {
            search_dirs: Vec::new(),
            library_names: vec!["libgsf-does-not-exist.so".into()],
        });
        let codec = GsfCodec::new(DecoderLibrary::new(loader), OutputSpec::default());
        assert!(codec.load().is_err());
        assert!(!codec.library().is_loaded());
    }

    #[test]
    fn test_capabilities() {
        let (_loader, codec) = codec(MockConfig::default());
        let info = codec.info();
        assert_eq!(info.tag, "GSF");
        assert_eq!(info.music_type, MusicType::Gsf);
        assert!(info.capabilities.contains(MusicCaps::SEEK | MusicCaps::META_TAGS));
        assert!(!info.capabilities.contains(MusicCaps::PAUSE));
        assert!(!info.capabilities.intersects(MusicCaps::SPEED | MusicCaps::LOOP_POINTS));
    }
}
