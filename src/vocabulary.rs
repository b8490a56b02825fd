//! Case-insensitive lookup of the values a key may take.

use std::collections::HashMap;

use crate::config::VocabularyConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VocabularyKind {
    Channel,
    Show,
    Person,
    Tag,
}

impl VocabularyKind {
    pub fn noun(self) -> &'static str {
        match self {
            VocabularyKind::Channel => "channel",
            VocabularyKind::Show => "show",
            VocabularyKind::Person => "person",
            VocabularyKind::Tag => "tag",
        }
    }
}

/// Source of valid values, consumed read-only by the validator
pub trait VocabularyProvider {
    /// Returns the canonical spelling of `value`, or `None` when it is unknown
    fn canonical(&self, kind: VocabularyKind, value: &str) -> Option<String>;
}

/// In-memory vocabularies indexed by lowercased value
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    channels: HashMap<String, String>,
    channel_aliases: HashMap<String, String>,
    shows: HashMap<String, String>,
    people: HashMap<String, String>,
    tags: HashMap<String, String>,
}

fn index<'a>(values: impl IntoIterator<Item = &'a String>) -> HashMap<String, String> {
    values
        .into_iter()
        .map(|v| (v.trim().to_lowercase(), v.trim().to_string()))
        .collect()
}

impl Vocabulary {
    pub fn from_config(config: &VocabularyConfig) -> Self {
        let channels = config
            .channels
            .iter()
            .map(|c| (c.trim().to_lowercase(), c.trim().to_uppercase()))
            .collect();
        let channel_aliases = config
            .channel_aliases
            .iter()
            .map(|(alias, target)| (alias.trim().to_lowercase(), target.trim().to_lowercase()))
            .collect();

        Self {
            channels,
            channel_aliases,
            shows: index(&config.shows),
            people: index(&config.people),
            tags: index(&config.tags),
        }
    }

    pub fn len(&self, kind: VocabularyKind) -> usize {
        self.table(kind).len()
    }

    fn table(&self, kind: VocabularyKind) -> &HashMap<String, String> {
        match kind {
            VocabularyKind::Channel => &self.channels,
            VocabularyKind::Show => &self.shows,
            VocabularyKind::Person => &self.people,
            VocabularyKind::Tag => &self.tags,
        }
    }
}

impl VocabularyProvider for Vocabulary {
    fn canonical(&self, kind: VocabularyKind, value: &str) -> Option<String> {
        let mut needle = value.trim().to_lowercase();
        if kind == VocabularyKind::Channel {
            if let Some(target) = self.channel_aliases.get(&needle) {
                needle = target.clone();
            }
        }
        self.table(kind).get(&needle).cloned()
    }
}
