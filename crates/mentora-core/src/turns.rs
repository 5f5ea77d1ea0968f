use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The document context that opens every session.
    Context,
    Candidate,
    Examiner,
}

impl Role {
    /// Speaker label used in transcripts.
    pub fn speaker(&self) -> &'static str {
        match self {
            Self::Context => "context",
            Self::Candidate => "user",
            Self::Examiner => "dosen",
        }
    }
}

/// One piece of turn content: plain text or an opaque image reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        content: String,
    },
    Image {
        mime_type: String,
        /// Base64-encoded image bytes.
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}

impl ContentBlock {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { content } => Some(content),
            Self::Image { .. } => None,
        }
    }
}

/// One unit of dialogue. Immutable once appended to a context window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Turn {
    pub fn candidate(text: impl Into<String>) -> Self {
        Self {
            role: Role::Candidate,
            content: vec![ContentBlock::text(text)],
        }
    }

    pub fn examiner(text: impl Into<String>) -> Self {
        Self {
            role: Role::Examiner,
            content: vec![ContentBlock::text(text)],
        }
    }

    pub fn context(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Context,
            content: blocks,
        }
    }

    /// Concatenated text blocks, skipping images.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// How a bounded turn log chooses what to evict once it is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Oldest turns go first, the opening context turn included.
    StrictCap,
    /// The opening context turn is pinned; eviction starts after it.
    #[default]
    PreserveInitialContext,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_block_wire_shape() {
        let block = ContentBlock::Image {
            mime_type: "image/png".into(),
            data: "aGVsbG8=".into(),
            caption: Some("Gambar".into()),
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["mime_type"], "image/png");
        assert_eq!(json["caption"], "Gambar");

        let text = serde_json::to_value(ContentBlock::text("hi")).unwrap();
        assert_eq!(text, serde_json::json!({"type": "text", "content": "hi"}));
    }

    #[test]
    fn image_without_caption_deserializes() {
        let block: ContentBlock =
            serde_json::from_str(r#"{"type":"image","mime_type":"image/jpeg","data":"x"}"#).unwrap();
        assert!(matches!(block, ContentBlock::Image { caption: None, .. }));
    }

    #[test]
    fn turn_text_skips_images() {
        let turn = Turn::context(vec![
            ContentBlock::text("[JUDUL]\nA"),
            ContentBlock::Image {
                mime_type: "image/png".into(),
                data: String::new(),
                caption: None,
            },
            ContentBlock::text("[ABSTRAK]\nB"),
        ]);
        assert_eq!(turn.text(), "[JUDUL]\nA\n[ABSTRAK]\nB");
    }

    #[test]
    fn role_speakers() {
        assert_eq!(Turn::candidate("x").role.speaker(), "user");
        assert_eq!(Turn::examiner("x").role.speaker(), "dosen");
    }
}
