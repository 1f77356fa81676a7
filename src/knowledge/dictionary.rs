use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::normalize::Vocabulary;
use crate::types::identifiers::TokenId;

/// Joins constituent surfaces of a multitoken.
pub const MULTITOKEN_SEPARATOR: &str = "~";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub id: TokenId,
    pub surface: String,
    /// Empty for single tokens.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constituents: Vec<TokenId>,
    pub collection_frequency: u64,
    pub document_frequency: u64,
}

impl DictionaryEntry {
    pub fn is_multitoken(&self) -> bool {
        !self.constituents.is_empty()
    }

    /// Number of single tokens this entry spans.
    pub fn span(&self) -> usize {
        self.constituents.len().max(1)
    }
}

/// Token and multitoken dictionary. The id of an entry is its position.
///
/// Append-only: ids are handed out on first insertion and never reused.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<DictionaryEntry>", into = "Vec<DictionaryEntry>")]
pub struct Dictionary {
    entries: Vec<DictionaryEntry>,
    by_surface: HashMap<String, TokenId>,
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl From<Vec<DictionaryEntry>> for Dictionary {
    fn from(entries: Vec<DictionaryEntry>) -> Self {
        let mut by_surface = HashMap::with_capacity(entries.len());
        for entry in &entries {
            by_surface.entry(entry.surface.clone()).or_insert(entry.id);
        }
        Self { entries, by_surface }
    }
}

impl From<Dictionary> for Vec<DictionaryEntry> {
    fn from(dictionary: Dictionary) -> Self {
        dictionary.entries
    }
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: TokenId) -> Option<&DictionaryEntry> {
        self.entries.get(id.index())
    }

    pub fn contains_id(&self, id: TokenId) -> bool {
        id.index() < self.entries.len()
    }

    pub fn id_of(&self, surface: &str) -> Option<TokenId> {
        self.by_surface.get(surface).copied()
    }

    pub fn surface(&self, id: TokenId) -> Option<&str> {
        self.get(id).map(|e| e.surface.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DictionaryEntry> {
        self.entries.iter()
    }

    pub fn multitokens(&self) -> impl Iterator<Item = &DictionaryEntry> {
        self.entries.iter().filter(|e| e.is_multitoken())
    }

    /// Surface form a multitoken over `constituents` would have.
    pub fn join_surface(&self, constituents: &[TokenId]) -> Option<String> {
        let parts: Option<Vec<&str>> = constituents.iter().map(|id| self.surface(*id)).collect();
        parts.map(|p| p.join(MULTITOKEN_SEPARATOR))
    }

    /// Id for `surface`, inserting a zero-frequency single token if unseen.
    pub(crate) fn intern(&mut self, surface: &str) -> TokenId {
        if let Some(id) = self.by_surface.get(surface) {
            return *id;
        }
        let id = TokenId::new(self.entries.len() as u32);
        self.entries.push(DictionaryEntry {
            id,
            surface: surface.to_string(),
            constituents: Vec::new(),
            collection_frequency: 0,
            document_frequency: 0,
        });
        self.by_surface.insert(surface.to_string(), id);
        id
    }

    /// Appends a multitoken; returns `None` if a constituent is unknown or
    /// the multitoken already exists.
    pub(crate) fn insert_multitoken(
        &mut self,
        constituents: Vec<TokenId>,
        collection_frequency: u64,
    ) -> Option<TokenId> {
        let surface = self.join_surface(&constituents)?;
        if self.by_surface.contains_key(&surface) {
            return None;
        }
        let id = TokenId::new(self.entries.len() as u32);
        self.by_surface.insert(surface.clone(), id);
        self.entries.push(DictionaryEntry {
            id,
            surface,
            constituents,
            collection_frequency,
            document_frequency: 0,
        });
        Some(id)
    }

    pub(crate) fn entry_mut(&mut self, id: TokenId) -> Option<&mut DictionaryEntry> {
        self.entries.get_mut(id.index())
    }
}

impl Vocabulary for Dictionary {
    fn frequency(&self, word: &str) -> u64 {
        self.id_of(word)
            .and_then(|id| self.get(id))
            .map_or(0, |e| e.collection_frequency)
    }
}
