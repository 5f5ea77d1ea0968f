//! Upload boundary: turns a decoded proposal into a stored exam session.
//!
//! Decoding the binary document is someone else's job; this takes its text
//! and embedded images page by page.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use mentora_core::ids::{SessionId, UserId};
use mentora_core::sections::ProposalContext;
use mentora_core::turns::ContentBlock;
use mentora_store::ExamSessionRepo;

use crate::error::UploadError;
use crate::extract::extract_sections;

const ABSTRACT_PREVIEW_CHARS: usize = 500;
const METHODOLOGY_PREVIEW_CHARS: usize = 1000;
const PREVIEW_MARKER: &str = "...";

/// Page words that mark a page as part of the methodology chapter.
const METHODOLOGY_PAGE_WORDS: [&str; 2] = ["metodologi", "metode"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedPage {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub images: Vec<PageImage>,
}

/// A proposal after binary decoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedDocument {
    pub filename: String,
    #[serde(default)]
    pub pages: Vec<DecodedPage>,
}

impl DecodedDocument {
    /// Page texts joined in order.
    pub fn full_text(&self) -> String {
        self.pages.iter().map(|p| p.text.as_str()).collect()
    }
}

/// What the candidate sees after a successful upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub status: String,
    pub session_id: SessionId,
    pub filename: String,
    pub title: String,
    pub context_summary: String,
    pub rumusan_masalah: String,
    pub tujuan_penelitian: String,
    pub metodologi: String,
}

/// Extract the proposal context from a decoded document without storing it.
pub fn prepare_proposal(doc: &DecodedDocument) -> Result<ProposalContext, UploadError> {
    if !doc.filename.ends_with(".pdf") {
        return Err(UploadError::UnsupportedFormat(doc.filename.clone()));
    }

    let sections = extract_sections(&doc.full_text());
    if sections.abstract_text.is_empty() && sections.methodology.is_empty() {
        return Err(UploadError::NothingExtracted);
    }

    Ok(ProposalContext {
        sections,
        figures: methodology_figures(&doc.pages),
    })
}

fn methodology_figures(pages: &[DecodedPage]) -> Vec<ContentBlock> {
    pages
        .iter()
        .enumerate()
        .filter(|(_, page)| {
            let lower = page.text.to_lowercase();
            METHODOLOGY_PAGE_WORDS.iter().any(|w| lower.contains(w))
        })
        .flat_map(|(idx, page)| {
            page.images.iter().map(move |img| ContentBlock::Image {
                mime_type: img.mime_type.clone(),
                data: img.data.clone(),
                caption: Some(format!("Gambar dari bab metodologi (Halaman {})", idx + 1)),
            })
        })
        .collect()
}

/// Extract, store, and summarize an uploaded proposal for `owner`.
#[instrument(skip_all, fields(user_id = %owner, filename = %doc.filename, pages = doc.pages.len()))]
pub fn ingest(repo: &ExamSessionRepo, owner: &UserId, doc: &DecodedDocument) -> Result<UploadSummary, UploadError> {
    let proposal = prepare_proposal(doc).inspect_err(|e| warn!(error = %e, "upload rejected"))?;
    let row = repo.create(owner, &doc.filename, &proposal)?;
    info!(
        session_id = %row.id,
        figures = proposal.figures.len(),
        "proposal stored"
    );

    let sections = proposal.sections;
    Ok(UploadSummary {
        status: "success".into(),
        session_id: row.id,
        filename: row.filename,
        title: sections.title,
        context_summary: preview(&sections.abstract_text, ABSTRACT_PREVIEW_CHARS),
        rumusan_masalah: sections.problem_statement,
        tujuan_penelitian: sections.objectives,
        metodologi: preview(&sections.methodology, METHODOLOGY_PREVIEW_CHARS),
    })
}

/// First `max_chars` characters followed by the marker, which is appended
/// even when nothing was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str(PREVIEW_MARKER);
    out
}
