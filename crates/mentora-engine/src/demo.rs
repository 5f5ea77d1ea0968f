//! Scripted examiner replies for demonstration mode. No model is called.

/// Keyword → reply, checked in order against the lower-cased utterance.
const DEMO_REPLIES: [(&str, &str); 3] = [
    (
        "latar belakang",
        "Tentu, bisa Anda jelaskan lebih detail mengenai latar belakang masalah yang Anda angkat?",
    ),
    (
        "metode",
        "Menarik. Coba uraikan metodologi penelitian yang akan Anda gunakan.",
    ),
    (
        "kebaruan",
        "Apa aspek kebaruan atau orisinalitas utama dari penelitian yang Anda usulkan ini?",
    ),
];

pub const DEFAULT_DEMO_REPLY: &str = "Itu poin yang menarik. Bisa tolong dielaborasi lebih lanjut?";

pub fn demo_reply(utterance: &str) -> &'static str {
    let lower = utterance.to_lowercase();
    DEMO_REPLIES
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map_or(DEFAULT_DEMO_REPLY, |(_, reply)| reply)
}
