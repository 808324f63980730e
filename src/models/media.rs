//! Media library records cached by the engine.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::cache::{serialized_len, Cacheable};

/// A single track as the library stores it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: i64,
    pub artist: String,
    pub song: String,
    #[serde(default)]
    pub genre1: String,
    #[serde(default)]
    pub genre2: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub published_date: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub played_times: u32,
    #[serde(default)]
    pub last_played: String,
}

impl MediaItem {
    pub fn new(id: i64, artist: impl Into<String>, song: impl Into<String>) -> Self {
        Self {
            id,
            artist: artist.into(),
            song: song.into(),
            ..Self::default()
        }
    }
}

impl Cacheable for MediaItem {
    fn size_hint(&self) -> usize {
        serialized_len(self)
    }

    fn type_tag(&self) -> &'static str {
        "media_item"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A search result set.
impl Cacheable for Vec<MediaItem> {
    fn size_hint(&self) -> usize {
        serialized_len(self)
    }

    fn type_tag(&self) -> &'static str {
        "media_items"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
