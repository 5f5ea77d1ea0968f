use serde::{Deserialize, Serialize};

use crate::turns::{ContentBlock, Turn};

/// The five sections pulled out of a proposal document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    Title,
    Abstract,
    ProblemStatement,
    Objectives,
    Methodology,
}

impl SectionKey {
    /// All keys in document order.
    pub const ALL: [SectionKey; 5] = [
        SectionKey::Title,
        SectionKey::Abstract,
        SectionKey::ProblemStatement,
        SectionKey::Objectives,
        SectionKey::Methodology,
    ];

    /// Heading used when the section is rendered into model context.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Title => "JUDUL",
            Self::Abstract => "ABSTRAK",
            Self::ProblemStatement => "RUMUSAN MASALAH",
            Self::Objectives => "TUJUAN PENELITIAN",
            Self::Methodology => "METODOLOGI",
        }
    }
}

/// Extracted section text keyed by [`SectionKey`]. Every key is always
/// present; an empty string means the section was not found.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionMap {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub problem_statement: String,
    pub objectives: String,
    pub methodology: String,
}

impl SectionMap {
    pub fn get(&self, key: SectionKey) -> &str {
        match key {
            SectionKey::Title => &self.title,
            SectionKey::Abstract => &self.abstract_text,
            SectionKey::ProblemStatement => &self.problem_statement,
            SectionKey::Objectives => &self.objectives,
            SectionKey::Methodology => &self.methodology,
        }
    }

    pub fn set(&mut self, key: SectionKey, value: String) {
        let slot = match key {
            SectionKey::Title => &mut self.title,
            SectionKey::Abstract => &mut self.abstract_text,
            SectionKey::ProblemStatement => &mut self.problem_statement,
            SectionKey::Objectives => &mut self.objectives,
            SectionKey::Methodology => &mut self.methodology,
        };
        *slot = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (SectionKey, &str)> {
        SectionKey::ALL.into_iter().map(move |k| (k, self.get(k)))
    }
}

/// Everything the examiner knows about a proposal: its sections plus any
/// figures lifted from the methodology pages. Produced once at upload and
/// shared read-only by every session built from it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalContext {
    pub sections: SectionMap,
    #[serde(default)]
    pub figures: Vec<ContentBlock>,
}

impl ProposalContext {
    pub fn new(sections: SectionMap) -> Self {
        Self {
            sections,
            figures: Vec::new(),
        }
    }

    /// Render as ordered blocks: one labelled text block per section, then
    /// the figures.
    pub fn blocks(&self) -> Vec<ContentBlock> {
        self.sections
            .iter()
            .map(|(key, text)| ContentBlock::text(format!("[{}]\n{}", key.label(), text)))
            .chain(self.figures.iter().cloned())
            .collect()
    }

    /// The context-establishing turn that opens every dialogue.
    pub fn opening_turn(&self) -> Turn {
        Turn::context(self.blocks())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turns::Role;

    #[test]
    fn every_key_is_serialized() {
        let json = serde_json::to_value(SectionMap::default()).unwrap();
        for key in ["title", "abstract", "problem_statement", "objectives", "methodology"] {
            assert_eq!(json[key], "", "missing {key}");
        }
    }

    #[test]
    fn get_and_set_agree() {
        let mut map = SectionMap::default();
        for (i, key) in SectionKey::ALL.into_iter().enumerate() {
            map.set(key, format!("v{i}"));
        }
        let values: Vec<_> = map.iter().map(|(_, v)| v.to_string()).collect();
        assert_eq!(values, ["v0", "v1", "v2", "v3", "v4"]);
    }

    #[test]
    fn blocks_are_labelled_in_order_with_figures_last() {
        let mut sections = SectionMap::default();
        sections.title = "Judul".into();
        sections.methodology = "Metode".into();
        let ctx = ProposalContext {
            sections,
            figures: vec![ContentBlock::Image {
                mime_type: "image/png".into(),
                data: "AAAA".into(),
                caption: Some("Gambar dari bab metodologi (Halaman 3)".into()),
            }],
        };

        let blocks = ctx.blocks();
        assert_eq!(blocks.len(), 6);
        assert_eq!(blocks[0].as_text(), Some("[JUDUL]\nJudul"));
        assert_eq!(blocks[1].as_text(), Some("[ABSTRAK]\n"));
        assert_eq!(blocks[4].as_text(), Some("[METODOLOGI]\nMetode"));
        assert!(matches!(blocks[5], ContentBlock::Image { .. }));

        assert_eq!(ctx.opening_turn().role, Role::Context);
    }
}
