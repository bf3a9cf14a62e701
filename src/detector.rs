use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Texts shorter than this (in characters) are never flagged.
pub const MIN_ANALYZED_CHARS: usize = 100;
pub const LONG_TEXT_CHARS: usize = 2000;
pub const AI_THRESHOLD: f64 = 0.3;

const PHRASE_WEIGHT: f64 = 0.3;
const STRUCTURE_WEIGHT: f64 = 0.2;
const UNIFORM_SENTENCES_WEIGHT: f64 = 0.15;
const IMPERSONAL_WEIGHT: f64 = 0.1;
const LONG_TEXT_WEIGHT: f64 = 0.1;

const STRUCTURE_MAX_LINES: usize = 5;
const SENTENCE_MIN_CHARS: usize = 10;
const UNIFORM_MIN_SENTENCES: usize = 5;
const UNIFORM_STD_DEV_RATIO: f64 = 0.2;
const IMPERSONAL_MIN_WORDS: usize = 100;
const IMPERSONAL_MIN_PRONOUNS: usize = 2;

/// Czech boilerplate typical for chatbot output. Lowercase; checked in order.
pub const AI_PHRASES: [&str; 10] = [
    "jako umělá inteligence",
    "jako jazykový model",
    "je důležité poznamenat",
    "je třeba zdůraznit",
    "stojí za zmínku",
    "v neposlední řadě",
    "hraje klíčovou roli",
    "na závěr lze říci",
    "celkově lze říci",
    "v dnešní době",
];

const FIRST_PERSON_PRONOUNS: [&str; 16] = [
    "já", "mě", "mně", "mi", "mnou", "můj", "moje", "mého", "mému", "mém", "mým", "my", "nás",
    "nám", "náš", "naše",
];

pub const REASON_STRUCTURED: &str =
    "Text je příliš strukturovaný (mnoho odrážek nebo číslovaných bodů)";
pub const REASON_UNIFORM_SENTENCES: &str =
    "Věty mají podezřele jednotnou délku (přirozený text bývá různorodější)";
pub const REASON_IMPERSONAL: &str = "Text téměř neobsahuje osobní zájmena (chybí osobní hlas)";
pub const REASON_LONG_TEXT: &str = "Velmi dlouhý vložený text";

static BULLET_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*[-•*][ \t]").expect("valid bullet regex"));
static NUMBERED_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*\d+\.[ \t]").expect("valid numbered-list regex"));

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(rename = "isLikelyAI")]
    pub is_likely_ai: bool,
    pub confidence: f64,
    pub reasons: Vec<String>,
}

impl Verdict {
    /// Reasons as a single line, the way they are stored on a flag.
    pub fn details(&self) -> String {
        self.reasons.join("; ")
    }
}

pub fn phrase_reason(phrase: &str) -> String {
    format!("Obsahuje frázi typickou pro AI: \"{phrase}\"")
}

/// Estimate whether `text` was produced by a generative AI tool.
///
/// Each heuristic is independent and additive; the sum is capped at 1.
/// Total over every input and linear in its length.
pub fn analyze(text: &str) -> Verdict {
    let char_len = text.chars().count();
    if char_len < MIN_ANALYZED_CHARS {
        return Verdict::default();
    }

    let mut score = 0.0_f64;
    let mut reasons = Vec::new();

    let lower = text.to_lowercase();
    for phrase in AI_PHRASES {
        if lower.contains(phrase) {
            score += PHRASE_WEIGHT;
            reasons.push(phrase_reason(phrase));
        }
    }

    let bullet_lines = BULLET_LINE_RE.find_iter(text).count();
    let numbered_lines = NUMBERED_LINE_RE.find_iter(text).count();
    if bullet_lines > STRUCTURE_MAX_LINES || numbered_lines > STRUCTURE_MAX_LINES {
        score += STRUCTURE_WEIGHT;
        reasons.push(REASON_STRUCTURED.to_string());
    }

    if has_uniform_sentences(text) {
        score += UNIFORM_SENTENCES_WEIGHT;
        reasons.push(REASON_UNIFORM_SENTENCES.to_string());
    }

    let word_count = text.split_whitespace().count();
    if word_count > IMPERSONAL_MIN_WORDS && count_pronouns(&lower) < IMPERSONAL_MIN_PRONOUNS {
        score += IMPERSONAL_WEIGHT;
        reasons.push(REASON_IMPERSONAL.to_string());
    }

    if char_len > LONG_TEXT_CHARS {
        score += LONG_TEXT_WEIGHT;
        reasons.push(REASON_LONG_TEXT.to_string());
    }

    let confidence = score.min(1.0);
    Verdict {
        is_likely_ai: confidence >= AI_THRESHOLD,
        confidence,
        reasons,
    }
}

fn has_uniform_sentences(text: &str) -> bool {
    let lengths: Vec<f64> = text
        .split(&['.', '!', '?'][..])
        .map(|s| s.trim().chars().count())
        .filter(|&len| len > SENTENCE_MIN_CHARS)
        .map(|len| len as f64)
        .collect();

    if lengths.len() < UNIFORM_MIN_SENTENCES {
        return false;
    }

    let n = lengths.len() as f64;
    let mean = lengths.iter().sum::<f64>() / n;
    let variance = lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() < UNIFORM_STD_DEV_RATIO * mean
}

// Expects already-lowercased text. Words are split on anything that is not a
// letter or digit, so accented Czech letters stay inside their word.
fn count_pronouns(lower: &str) -> usize {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| FIRST_PERSON_PRONOUNS.contains(w))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Three sentences of very different length, four first-person pronouns.
    const PERSONAL_TRIPLE: &str = "Já mám rád psy. \
        Včera jsme s mým bratrem byli na dlouhé procházce v lese za vesnicí. \
        Moje babička peče nejlepší buchty na světě a vždycky mi dá ochutnat, \
        když k ní přijedu na prázdniny do malého domku u řeky.";

    fn personal_prose(triples: usize) -> String {
        vec![PERSONAL_TRIPLE; triples].join(" ")
    }

    #[test]
    fn short_text_is_never_flagged() {
        let v = analyze("Jako umělá inteligence nemohu odpovědět.");
        assert_eq!(v, Verdict::default());
        assert_eq!(analyze(""), Verdict::default());
    }

    #[test]
    fn personal_prose_is_clean() {
        let text = personal_prose(4);
        assert!(text.split_whitespace().count() >= 150);
        assert!(text.chars().count() < LONG_TEXT_CHARS);

        let v = analyze(&text);
        assert!(!v.is_likely_ai);
        assert_eq!(v.confidence, 0.0);
        assert!(v.reasons.is_empty(), "unexpected reasons: {:?}", v.reasons);
    }

    #[test]
    fn two_phrases_are_reported_in_table_order() {
        let text = format!(
            "Je důležité poznamenat, že já sám to vidím trochu jinak. {} \
             Jako umělá inteligence nemohu mít vlastní názor na tuto otázku.",
            PERSONAL_TRIPLE
        );
        assert!(text.chars().count() >= 200);

        let v = analyze(&text);
        assert!(v.is_likely_ai);
        assert!((v.confidence - 0.6).abs() < 1e-9);
        assert_eq!(
            v.reasons,
            vec![
                phrase_reason("jako umělá inteligence"),
                phrase_reason("je důležité poznamenat"),
            ]
        );
    }

    #[test]
    fn phrase_match_ignores_case_of_accented_letters() {
        let text = format!("JAKO UMĚLÁ INTELIGENCE odpovídám takto. {PERSONAL_TRIPLE}");
        let v = analyze(&text);
        assert_eq!(v.reasons, vec![phrase_reason("jako umělá inteligence")]);
    }

    #[test]
    fn long_text_alone_adds_a_tenth() {
        let text = personal_prose(12);
        assert!(text.chars().count() > 2400);

        let v = analyze(&text);
        assert!(!v.is_likely_ai);
        assert!((v.confidence - 0.1).abs() < 1e-9);
        assert_eq!(v.reasons, vec![REASON_LONG_TEXT.to_string()]);
    }

    fn first_chars(text: &str, n: usize) -> String {
        let out: String = text.chars().take(n).collect();
        assert_eq!(out.chars().count(), n);
        out
    }

    #[test]
    fn exactly_2500_chars_only_trip_the_length_check() {
        let text = first_chars(&personal_prose(13), 2500);
        let v = analyze(&text);
        assert_eq!(v.confidence, 0.1);
        assert_eq!(v.reasons, vec![REASON_LONG_TEXT.to_string()]);
        assert!(!v.is_likely_ai);
    }

    #[test]
    fn length_outlier_starts_above_2000_chars() {
        let prose = personal_prose(10);
        assert!(analyze(&first_chars(&prose, 2000)).reasons.is_empty());
        assert_eq!(
            analyze(&first_chars(&prose, 2001)).reasons,
            vec![REASON_LONG_TEXT.to_string()]
        );
    }

    #[test]
    fn hundred_chars_are_analyzed_ninety_nine_are_not() {
        let mut text = String::from("Jako umělá inteligence říkám ");
        while text.chars().count() < 100 {
            text.push('a');
        }
        let v = analyze(&text);
        assert!(v.is_likely_ai);
        assert_eq!(v.confidence, 0.3);
        assert_eq!(v.reasons, vec![phrase_reason("jako umělá inteligence")]);

        assert_eq!(analyze(&first_chars(&text, 99)), Verdict::default());
    }

    #[test]
    fn numbered_list_counts_as_structure() {
        let mut text = String::from("Dnes musím stihnout spoustu věcí, takže jsem si je sepsal:\n");
        for (i, item) in [
            "Koupit mléko a chleba",
            "Umýt nádobí po obědě",
            "Napsat úkol z matematiky",
            "Zavolat babičce",
            "Vyvenčit psa v parku",
            "Uklidit si pokoj",
            "Přečíst kapitolu knihy",
            "Připravit tašku do školy",
        ]
        .iter()
        .enumerate()
        {
            text.push_str(&format!("{}. {}\n", i + 1, item));
        }
        text.push_str("Potom si já konečně odpočinu.");

        let v = analyze(&text);
        assert!(v.reasons.iter().any(|r| r == REASON_STRUCTURED));
        assert!(v.confidence >= 0.2);
    }

    #[test]
    fn five_bullets_are_not_enough() {
        let mut text = String::from("Můj nákupní seznam na víkend, který mi dala máma:\n");
        for item in ["mléko", "chleba", "máslo", "sýr", "jablka"] {
            text.push_str(&format!("- {item} z obchodu\n"));
        }
        let v = analyze(&text);
        assert!(!v.reasons.iter().any(|r| r == REASON_STRUCTURED));
    }

    #[test]
    fn uniform_sentences_are_flagged() {
        let sentence = "Toto je věta se zcela stejnou délkou";
        let text = vec![sentence; 6].join(". ") + ".";
        let v = analyze(&text);
        assert_eq!(v.reasons, vec![REASON_UNIFORM_SENTENCES.to_string()]);
        assert!((v.confidence - 0.15).abs() < 1e-9);
        assert!(!v.is_likely_ai);
    }

    #[test]
    fn impersonal_long_text_is_flagged() {
        let sentences = [
            "Fotosyntéza probíhá v chloroplastech",
            "Rostliny přeměňují světelnou energii na chemickou energii glukózy a přitom uvolňují kyslík do ovzduší",
            "Voda se štěpí",
            "Oxid uhličitý vstupuje do Calvinova cyklu, kde se postupně váže na ribulózu a vzniká cukr",
        ];
        let mut text = String::new();
        while text.split_whitespace().count() <= 120 {
            for s in sentences {
                text.push_str(s);
                text.push_str(". ");
            }
        }
        let v = analyze(&text);
        assert!(v.reasons.iter().any(|r| r == REASON_IMPERSONAL));
    }

    #[test]
    fn pronouns_match_whole_words_only() {
        assert_eq!(count_pronouns("mimo mimochodem mít"), 0);
        assert_eq!(count_pronouns("já a mě, mně!"), 3);
    }

    #[test]
    fn confidence_is_capped_at_one() {
        let text = AI_PHRASES.join(". ") + ". " + PERSONAL_TRIPLE;
        let v = analyze(&text);
        assert_eq!(v.confidence, 1.0);
        assert!(v.is_likely_ai);
        assert_eq!(v.reasons.len(), AI_PHRASES.len());
    }

    #[test]
    fn verdict_serializes_with_ui_field_names() {
        let v = Verdict {
            is_likely_ai: true,
            confidence: 0.3,
            reasons: vec!["a".into(), "b".into()],
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["isLikelyAI"], true);
        assert_eq!(json["reasons"][1], "b");
        assert_eq!(v.details(), "a; b");
    }

    proptest! {
        #[test]
        fn short_inputs_score_zero(text in "\\PC{0,99}") {
            prop_assume!(text.chars().count() < MIN_ANALYZED_CHARS);
            let v = analyze(&text);
            prop_assert_eq!(v.confidence, 0.0);
            prop_assert!(v.reasons.is_empty());
        }

        #[test]
        fn confidence_is_bounded_and_consistent(text in "\\PC{0,3000}") {
            let v = analyze(&text);
            prop_assert!((0.0..=1.0).contains(&v.confidence));
            prop_assert_eq!(v.is_likely_ai, v.confidence >= AI_THRESHOLD);
        }

        #[test]
        fn analysis_is_deterministic(text in "(\\PC|\n){0,1500}") {
            let a = analyze(&text);
            let b = analyze(&text);
            prop_assert_eq!(a.confidence.to_bits(), b.confidence.to_bits());
            prop_assert_eq!(a, b);
        }
    }
}
