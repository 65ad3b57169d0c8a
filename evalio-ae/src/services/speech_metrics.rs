//! Speech flow analysis
//!
//! Pure function of transcript and duration. Scores are penalty based: an
//! answer starts at 100 and loses points for fillers, pauses, brevity and an
//! unnatural pace.

use evalio_common::scoring::clamp_score;

use crate::models::SpeechMetrics;

/// Single-token filler words (compared lowercase)
///
/// "you know" is listed for completeness; tokens never contain spaces so it
/// only matters if tokenisation changes.
pub const FILLER_WORDS: &[&str] = &[
    "uh", "um", "like", "you know", "actually", "basically", "so",
];

/// Answers shorter than this lose points per missing word
const SHORT_ANSWER_WORDS: u32 = 20;
const SHORT_ANSWER_PENALTY_PER_WORD: u32 = 2;
const SHORT_ANSWER_PENALTY_CAP: u32 = 40;

/// Natural speaking pace, words per minute (inclusive)
const MIN_NATURAL_WPM: f64 = 70.0;
const MAX_NATURAL_WPM: f64 = 185.0;
const PACE_PENALTY: u32 = 12;

/// Seconds of speech per assumed natural pause
const SECONDS_PER_PAUSE: f64 = 12.0;

const FLUENCY_PENALTY_CAP: u32 = 70;
const SPEECH_FLOW_PENALTY_CAP: u32 = 75;

/// Quality gate thresholds applied before content evaluation
pub const MIN_WORD_COUNT: u32 = 8;
pub const MIN_TRANSCRIPTION_CONFIDENCE: f64 = 0.45;

/// Metrics plus the two delivery scores derived from them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechAnalysis {
    pub metrics: SpeechMetrics,
    pub fluency_score: u8,
    pub speech_flow_score: u8,
}

/// Word-like tokens: runs of alphanumerics, `_`, `'` and `-`, trimmed of
/// leading/trailing `'`/`-`, lowercased
pub fn tokenize(transcript: &str) -> Vec<String> {
    transcript
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '\'' || c == '-'))
        .map(|run| run.trim_matches(|c: char| c == '\'' || c == '-'))
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Analyse a transcript spoken over `duration_sec` seconds
pub fn analyze_speech(transcript: &str, duration_sec: f64) -> SpeechAnalysis {
    let words = tokenize(transcript);
    let word_count = words.len() as u32;
    let filler_word_count = words
        .iter()
        .filter(|w| FILLER_WORDS.contains(&w.as_str()))
        .count() as u32;

    let words_per_minute = if duration_sec > 0.0 {
        round_to(word_count as f64 / duration_sec * 60.0, 2)
    } else {
        0.0
    };

    let pause_count = ((duration_sec / SECONDS_PER_PAUSE).round() - 1.0).max(0.0) as u32;

    let disfluency_ratio = if word_count > 0 {
        round_to((filler_word_count + pause_count) as f64 / word_count as f64, 3)
    } else {
        1.0
    };

    let short_answer_penalty = if word_count < SHORT_ANSWER_WORDS {
        ((SHORT_ANSWER_WORDS - word_count) * SHORT_ANSWER_PENALTY_PER_WORD)
            .min(SHORT_ANSWER_PENALTY_CAP)
    } else {
        0
    };

    let pace_penalty = if !(MIN_NATURAL_WPM..=MAX_NATURAL_WPM).contains(&words_per_minute) {
        PACE_PENALTY
    } else {
        0
    };

    let fluency_penalty = (filler_word_count * 3
        + pause_count * 2
        + short_answer_penalty
        + pace_penalty)
        .min(FLUENCY_PENALTY_CAP);

    let disfluency_points = (disfluency_ratio * 100.0).round() as u32;
    let speech_flow_penalty =
        (disfluency_points + short_answer_penalty + pace_penalty).min(SPEECH_FLOW_PENALTY_CAP);

    SpeechAnalysis {
        metrics: SpeechMetrics {
            word_count,
            filler_word_count,
            pause_count,
            words_per_minute,
            disfluency_ratio,
        },
        fluency_score: clamp_score(100.0 - fluency_penalty as f64),
        speech_flow_score: clamp_score(100.0 - speech_flow_penalty as f64),
    }
}

/// Whether a transcript is usable for content evaluation
pub fn passes_quality_gate(word_count: u32, confidence: f64) -> bool {
    word_count >= MIN_WORD_COUNT && confidence >= MIN_TRANSCRIPTION_CONFIDENCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Well -- I don't know, it's state-of-the-art!"),
            vec!["well", "i", "don't", "know", "it's", "state-of-the-art"]
        );
        assert!(tokenize("  ...  ").is_empty());
        assert_eq!(tokenize("'quoted'"), vec!["quoted"]);
    }

    #[test]
    fn test_short_slow_answer_scenario() {
        // 9 words, 3 fillers (um, so, basically), 15 s
        let analysis = analyze_speech("um so I basically built a small caching layer", 15.0);
        let m = analysis.metrics;
        assert_eq!(m.word_count, 9);
        assert_eq!(m.filler_word_count, 3);
        assert_eq!(m.words_per_minute, 36.0);
        assert_eq!(m.pause_count, 0);
        assert_eq!(m.disfluency_ratio, 0.333);
        // min(70, 9 + 0 + 22 + 12) = 43
        assert_eq!(analysis.fluency_score, 57);
        // min(75, 33 + 22 + 12) = 67
        assert_eq!(analysis.speech_flow_score, 33);
    }

    #[test]
    fn test_every_listed_single_word_filler_counts() {
        let analysis = analyze_speech("um so basically I built a uh caching layer", 15.0);
        assert_eq!(analysis.metrics.word_count, 9);
        assert_eq!(analysis.metrics.filler_word_count, 4);
        // min(70, 12 + 0 + 22 + 12) = 46
        assert_eq!(analysis.fluency_score, 54);
    }

    #[test]
    fn test_fluent_answer_scores_high() {
        let transcript = "I designed the service around a write ahead log so that every \
                          change is durable before we acknowledge the client and we replicate \
                          asynchronously to two followers in other zones";
        let analysis = analyze_speech(transcript, 12.0);
        let m = analysis.metrics;
        assert_eq!(m.word_count, 30);
        // "so" is the only filler
        assert_eq!(m.filler_word_count, 1);
        assert_eq!(m.pause_count, 0);
        assert_eq!(m.words_per_minute, 150.0);
        assert_eq!(analysis.fluency_score, 97);
        // ratio 0.033 -> 3 points
        assert_eq!(analysis.speech_flow_score, 97);
    }

    #[test]
    fn test_pauses_from_duration() {
        assert_eq!(analyze_speech("word", 5.0).metrics.pause_count, 0);
        assert_eq!(analyze_speech("word", 18.0).metrics.pause_count, 1);
        assert_eq!(analyze_speech("word", 60.0).metrics.pause_count, 4);
    }

    #[test]
    fn test_empty_transcript_is_maximally_disfluent() {
        let analysis = analyze_speech("", 10.0);
        assert_eq!(analysis.metrics.word_count, 0);
        assert_eq!(analysis.metrics.disfluency_ratio, 1.0);
        assert_eq!(analysis.metrics.words_per_minute, 0.0);
        // min(70, 0 + 0 + 40 + 12) = 52
        assert_eq!(analysis.fluency_score, 48);
        // min(75, 100 + 40 + 12) = 75
        assert_eq!(analysis.speech_flow_score, 25);
    }

    #[test]
    fn test_zero_duration() {
        let analysis = analyze_speech("one two three", 0.0);
        assert_eq!(analysis.metrics.words_per_minute, 0.0);
        assert_eq!(analysis.metrics.pause_count, 0);
    }

    #[test]
    fn test_fluency_never_increases_with_fillers() {
        let base: Vec<&str> = "we split the monolith into services along team boundaries \
                               and moved shared data behind versioned APIs which took \
                               about two quarters with a small dedicated platform group \
                               across three offices"
            .split_whitespace()
            .collect();
        assert_eq!(base.len(), 30);

        let mut previous = u8::MAX;
        for fillers in 0..=base.len() {
            let words: Vec<&str> = base
                .iter()
                .enumerate()
                .map(|(i, w)| if i < fillers { "um" } else { *w })
                .collect();
            let analysis = analyze_speech(&words.join(" "), 15.0);
            assert_eq!(analysis.metrics.word_count, 30);
            assert!(analysis.fluency_score <= previous);
            previous = analysis.fluency_score;
        }
    }

    #[test]
    fn test_scores_stay_in_range() {
        for words in [0usize, 1, 7, 8, 19, 20, 60, 400] {
            for duration in [0.5, 5.0, 30.0, 90.0, 180.0] {
                let transcript = vec!["um"; words].join(" ");
                let analysis = analyze_speech(&transcript, duration);
                assert!(analysis.fluency_score <= 100);
                assert!(analysis.speech_flow_score <= 100);
                assert!(analysis.fluency_score >= 30);
                assert!(analysis.speech_flow_score >= 25);
            }
        }
    }

    #[test]
    fn test_quality_gate() {
        assert!(passes_quality_gate(8, 0.45));
        assert!(!passes_quality_gate(7, 0.99));
        assert!(!passes_quality_gate(5, 0.3));
        assert!(!passes_quality_gate(40, 0.44));
    }
}
