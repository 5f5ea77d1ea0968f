//! Request bodies for the Gemini `generateContent` API and parsing of its
//! responses.

use serde_json::{json, Value};

use mentora_core::errors::CollaboratorError;
use mentora_core::provider::{ReplyRequest, ScoreBreakdown};
use mentora_core::turns::{ContentBlock, Role, Turn};

const CONTEXT_PREAMBLE: &str =
    "Berikut konteks proposal skripsi mahasiswa yang menjadi dasar diskusi:";

/// Build the body for an examiner reply. The history is sent as-is; when
/// its opening context turn has been evicted, the proposal is re-rendered
/// in front of it so the model always sees the document.
pub fn build_reply_body(request: &ReplyRequest, system_prompt: &str) -> Value {
    let mut contents = Vec::with_capacity(request.history.len() + 1);
    if request.history.first().map(|t| t.role) != Some(Role::Context) {
        contents.push(convert_turn(&request.proposal.opening_turn()));
    }
    contents.extend(request.history.iter().map(convert_turn));

    json!({
        "system_instruction": {"parts": [{"text": system_prompt}]},
        "contents": contents,
    })
}

/// Build the body for grading a rendered transcript. The model is asked
/// for a JSON document.
pub fn build_scoring_body(transcript: &str, system_prompt: &str) -> Value {
    let prompt = format!(
        "Nilailah hanya ucapan \"user\" pada transkrip berikut.\n\
         --- TRANSKRIP ---\n{transcript}\n--- AKHIR TRANSKRIP ---"
    );
    json!({
        "system_instruction": {"parts": [{"text": system_prompt}]},
        "contents": [{"role": "user", "parts": [{"text": prompt}]}],
        "generationConfig": {"responseMimeType": "application/json"},
    })
}

fn convert_turn(turn: &Turn) -> Value {
    let role = match turn.role {
        Role::Context | Role::Candidate => "user",
        Role::Examiner => "model",
    };

    let mut parts = Vec::new();
    if turn.role == Role::Context {
        parts.push(json!({"text": CONTEXT_PREAMBLE}));
    }
    for block in &turn.content {
        match block {
            ContentBlock::Text { content } => parts.push(json!({"text": content})),
            ContentBlock::Image {
                mime_type,
                data,
                caption,
            } => {
                if let Some(caption) = caption {
                    parts.push(json!({"text": format!("Gambar berikut berketerangan: {caption}")}));
                }
                parts.push(json!({"inline_data": {"mime_type": mime_type, "data": data}}));
            }
        }
    }

    json!({"role": role, "parts": parts})
}

/// Concatenate the text parts of the first candidate.
pub fn extract_text(response: &Value) -> Result<String, CollaboratorError> {
    let parts = response["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| {
            let reason = response["candidates"][0]["finishReason"]
                .as_str()
                .or_else(|| response["promptFeedback"]["blockReason"].as_str())
                .unwrap_or("no candidates");
            CollaboratorError::MalformedResponse(format!("empty response: {reason}"))
        })?;

    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.trim().is_empty() {
        return Err(CollaboratorError::MalformedResponse("response has no text".into()));
    }
    Ok(text)
}

/// Strip markdown the model sometimes emits despite instructions, so the
/// reply reads cleanly and can be spoken.
pub fn speakable(text: &str) -> String {
    text.lines()
        .map(|line| {
            let line = line.trim_start_matches(|c: char| c == '#' || c == '>').trim_start();
            line.replace("**", "").replace('*', "").replace('`', "")
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Parse the scorer's JSON. Tolerates code fences and fractional scores;
/// scores are rounded and clamped into 0–100.
pub fn parse_score(text: &str) -> Result<ScoreBreakdown, CollaboratorError> {
    let body = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let value: Value = serde_json::from_str(body)
        .map_err(|e| CollaboratorError::MalformedResponse(format!("score is not JSON: {e}")))?;
    if !value.is_object() {
        return Err(CollaboratorError::MalformedResponse("score is not an object".into()));
    }

    let score = |key: &str| -> u32 {
        value[key]
            .as_f64()
            .map(|n| n.round().clamp(0.0, 100.0) as u32)
            .unwrap_or(0)
    };

    Ok(ScoreBreakdown {
        relevance: score("relevance"),
        clarity: score("clarity"),
        mastery: score("mastery"),
        feedback: value["feedback"].as_str().unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mentora_core::sections::{ProposalContext, SectionMap};

    use super::*;

    fn proposal() -> Arc<ProposalContext> {
        let mut sections = SectionMap::default();
        sections.title = "Deteksi Hoaks".into();
        Arc::new(ProposalContext {
            sections,
            figures: vec![ContentBlock::Image {
                mime_type: "image/png".into(),
                data: "QUJD".into(),
                caption: Some("Gambar dari bab metodologi (Halaman 7)".into()),
            }],
        })
    }

    #[test]
    fn reply_body_keeps_existing_context_turn() {
        let proposal = proposal();
        let request = ReplyRequest {
            proposal: proposal.clone(),
            history: vec![
                proposal.opening_turn(),
                Turn::examiner("Silakan mulai."),
                Turn::candidate("Penelitian saya tentang hoaks."),
            ],
        };
        let body = build_reply_body(&request, "SYS");

        assert_eq!(body["system_instruction"]["parts"][0]["text"], "SYS");
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], CONTEXT_PREAMBLE);
        assert_eq!(contents[0]["parts"][1]["text"], "[JUDUL]\nDeteksi Hoaks");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "Penelitian saya tentang hoaks.");
    }

    #[test]
    fn reply_body_restores_evicted_context() {
        let request = ReplyRequest {
            proposal: proposal(),
            history: vec![Turn::candidate("Jawaban saya.")],
        };
        let contents = build_reply_body(&request, "SYS")["contents"].clone();
        let contents = contents.as_array().unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0]["parts"][0]["text"], CONTEXT_PREAMBLE);
    }

    #[test]
    fn images_carry_caption_then_inline_data() {
        let turn = proposal().opening_turn();
        let converted = convert_turn(&turn);
        let parts = converted["parts"].as_array().unwrap();
        // preamble + 5 sections + caption + image
        assert_eq!(parts.len(), 8);
        assert_eq!(
            parts[6]["text"],
            "Gambar berikut berketerangan: Gambar dari bab metodologi (Halaman 7)"
        );
        assert_eq!(parts[7]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[7]["inline_data"]["data"], "QUJD");
    }

    #[test]
    fn scoring_body_requests_json() {
        let body = build_scoring_body("dosen: Halo\nuser: Halo pak", "RUBRIC");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("user: Halo pak"));
    }

    #[test]
    fn extract_text_joins_parts() {
        let resp = json!({"candidates": [{"content": {"parts": [{"text": "Baik. "}, {"text": "Lanjutkan."}]}}]});
        assert_eq!(extract_text(&resp).unwrap(), "Baik. Lanjutkan.");
    }

    #[test]
    fn extract_text_reports_block_reason() {
        let resp = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = extract_text(&resp).unwrap_err();
        assert!(err.to_string().contains("SAFETY"), "{err}");

        let empty = json!({"candidates": [{"content": {"parts": [{"text": "  "}]}}]});
        assert!(matches!(
            extract_text(&empty),
            Err(CollaboratorError::MalformedResponse(_))
        ));
    }

    #[test]
    fn speakable_strips_markdown() {
        assert_eq!(
            speakable("## Pertanyaan\n**Mengapa** memilih *metode* ini?"),
            "Pertanyaan\nMengapa memilih metode ini?"
        );
        assert_eq!(speakable("Kalimat biasa."), "Kalimat biasa.");
    }

    #[test]
    fn parse_score_handles_fences_and_fractions() {
        let score = parse_score(
            "```json\n{\"relevance\": 82.6, \"clarity\": 140, \"mastery\": -3, \"feedback\": \"Perjelas metode.\"}\n```",
        )
        .unwrap();
        assert_eq!(score.relevance, 83);
        assert_eq!(score.clarity, 100);
        assert_eq!(score.mastery, 0);
        assert_eq!(score.feedback, "Perjelas metode.");
    }

    #[test]
    fn parse_score_defaults_missing_fields() {
        let score = parse_score(r#"{"relevance": 50}"#).unwrap();
        assert_eq!(score.clarity, 0);
        assert_eq!(score.feedback, "");
    }

    #[test]
    fn parse_score_rejects_non_json() {
        assert!(parse_score("Nilai: 80").is_err());
        assert!(parse_score("[1, 2]").is_err());
    }
}
