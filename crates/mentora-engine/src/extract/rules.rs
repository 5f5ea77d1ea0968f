use mentora_core::sections::SectionKey;

/// Start and end headings that delimit one section.
#[derive(Clone, Copy, Debug)]
pub struct SectionRule {
    pub key: SectionKey,
    pub start_keys: &'static [&'static str],
    pub end_keys: &'static [&'static str],
}

/// Keys that end the title search window.
pub const TITLE_WINDOW_END: &[&str] = &["ABSTRAK", "ABSTRACT"];

/// Lines containing any of these are cover-page boilerplate, never a title.
pub const TITLE_STOPWORDS: &[&str] = &["SKRIPSI", "TESIS", "TUGAS AKHIR", "UNIVERSITAS"];

pub const SECTION_RULES: [SectionRule; 4] = [
    SectionRule {
        key: SectionKey::Abstract,
        start_keys: &["ABSTRAK", "ABSTRACT"],
        end_keys: &["KATA KUNCI", "PENDAHULUAN", "BAB I", "I. PENDAHULUAN"],
    },
    SectionRule {
        key: SectionKey::ProblemStatement,
        start_keys: &["RUMUSAN MASALAH"],
        end_keys: &["TUJUAN PENELITIAN", "BATASAN MASALAH"],
    },
    SectionRule {
        key: SectionKey::Objectives,
        start_keys: &["TUJUAN PENELITIAN"],
        end_keys: &["MANFAAT PENELITIAN", "BATASAN MASALAH", "BAB II"],
    },
    SectionRule {
        key: SectionKey::Methodology,
        start_keys: &["METODOLOGI PENELITIAN", "METODE PENELITIAN", "BAB III", "III. METODE"],
        end_keys: &["HASIL DAN PEMBAHASAN", "BAB IV"],
    },
];
