//! Generic metadata tag container.
//!
//! The host asks every codec for the same small set of tags; GSF images carry
//! them as PSF-style `title`/`artist`/`game`/`copyright` fields, where the
//! game name fills the album slot.

use std::fmt;

/// Tag kinds the host can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaTag {
    /// Song title
    Title,
    /// Composer / artist
    Artist,
    /// Album (the game the music comes from)
    Album,
    /// Copyright holder
    Copyright,
}

impl MetaTag {
    /// All tag kinds, in storage order.
    pub const ALL: [MetaTag; 4] = [
        MetaTag::Title,
        MetaTag::Artist,
        MetaTag::Album,
        MetaTag::Copyright,
    ];

    fn index(self) -> usize {
        match self {
            MetaTag::Title => 0,
            MetaTag::Artist => 1,
            MetaTag::Album => 2,
            MetaTag::Copyright => 3,
        }
    }
}

impl fmt::Display for MetaTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetaTag::Title => "title",
            MetaTag::Artist => "artist",
            MetaTag::Album => "album",
            MetaTag::Copyright => "copyright",
        };
        f.write_str(name)
    }
}

/// Tag storage for one opened track.
///
/// Unset tags read back as an empty string, matching what the host mixer
/// returns for codecs that have no metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaTags {
    values: [Option<String>; 4],
}

impl MetaTags {
    /// Empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a tag; `None` or an empty value unsets it.
    pub fn set(&mut self, tag: MetaTag, value: Option<&str>) {
        self.values[tag.index()] = value.filter(|v| !v.is_empty()).map(str::to_owned);
    }

    /// Tag value, or `""` if unset.
    pub fn get(&self, tag: MetaTag) -> &str {
        self.values[tag.index()].as_deref().unwrap_or("")
    }

    /// Whether `tag` has a value.
    pub fn contains(&self, tag: MetaTag) -> bool {
        self.values[tag.index()].is_some()
    }

    /// Unset every tag.
    pub fn clear(&mut self) {
        self.values = Default::default();
    }

    /// Whether no tag is set.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// Title, `""` if unset.
    pub fn title(&self) -> &str {
        self.get(MetaTag::Title)
    }

    /// Artist, `""` if unset.
    pub fn artist(&self) -> &str {
        self.get(MetaTag::Artist)
    }

    /// Album (the game for GSF), `""` if unset.
    pub fn album(&self) -> &str {
        self.get(MetaTag::Album)
    }

    /// Copyright, `""` if unset.
    pub fn copyright(&self) -> &str {
        self.get(MetaTag::Copyright)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_clear() {
        let mut tags = MetaTags::new();
        assert!(tags.is_empty());
        assert_eq!(tags.title(), "");

        tags.set(MetaTag::Title, Some("Route 1"));
        tags.set(MetaTag::Album, Some("Pocket Adventure"));
        assert_eq!(tags.get(MetaTag::Title), "Route 1");
        assert_eq!(tags.album(), "Pocket Adventure");
        assert!(!tags.contains(MetaTag::Artist));

        tags.clear();
        assert!(tags.is_empty());
        assert_eq!(tags.album(), "");
    }

    #[test]
    fn test_empty_value_unsets() {
        let mut tags = MetaTags::new();
        tags.set(MetaTag::Artist, Some("Composer"));
        tags.set(MetaTag::Artist, Some(""));
        assert!(!tags.contains(MetaTag::Artist));
        tags.set(MetaTag::Copyright, None);
        assert!(tags.is_empty());
    }

    #[test]
    fn test_display_names() {
        let names: Vec<String> = MetaTag::ALL.iter().map(|t| t.to_string()).collect();
        assert_eq!(names, ["title", "artist", "album", "copyright"]);
    }
}
