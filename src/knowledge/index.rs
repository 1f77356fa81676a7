use std::collections::HashMap;

use crate::association::AssociationKind;
use crate::knowledge::KnowledgeBaseSnapshot;
use crate::multitoken::MultitokenIndex;
use crate::types::identifiers::TokenId;

/// Query-time lookups derived once per snapshot.
///
/// Holds the multitoken segmenter and, for every token, its positive
/// `related` and `see-also` partners.
#[derive(Debug, Clone, Default)]
pub struct SnapshotIndex {
    segmenter: MultitokenIndex,
    links: HashMap<TokenId, Vec<(TokenId, f64)>>,
}

impl SnapshotIndex {
    pub fn build(snapshot: &KnowledgeBaseSnapshot) -> Self {
        let mut links: HashMap<TokenId, Vec<(TokenId, f64)>> = HashMap::new();
        for table in [&snapshot.hash_related, &snapshot.hash_see] {
            for (id, partners) in table.neighbors() {
                let linked = partners
                    .into_iter()
                    .filter(|(_, score, kind)| *kind != AssociationKind::Distant && *score > 0.0)
                    .map(|(partner, score, _)| (partner, score));
                links.entry(id).or_default().extend(linked);
            }
        }
        links.retain(|_, partners| !partners.is_empty());

        Self {
            segmenter: snapshot.multitoken_index(),
            links,
        }
    }

    pub fn segmenter(&self) -> &MultitokenIndex {
        &self.segmenter
    }

    /// Positive `related` and `see-also` partners of `id`, one item per link.
    pub fn links(&self, id: TokenId) -> &[(TokenId, f64)] {
        self.links.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}
