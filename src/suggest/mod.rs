//! Heuristic metadata suggestions for the admin form.
//!
//! Everything here is a guess from keywords, file names and dice rolls.
//! Suggestions only ever pre-fill a draft; the admin reviews them and the
//! validator has the last word.

use crate::catalog_store::{Category, Difficulty, EntryDraft};
use lazy_static::lazy_static;
use rand::seq::IndexedRandom;
use rand::Rng;
use regex::{Captures, Regex};

lazy_static! {
    static ref FILE_EXTENSION: Regex = Regex::new(r"\.[^/.]+$").unwrap();
    static ref WORD_START: Regex = Regex::new(r"\b\w").unwrap();
}

const KEYS: [&str; 28] = [
    "C Major", "G Major", "D Major", "A Major", "E Major", "B Major", "F# Major", "C# Major",
    "F Major", "Bb Major", "Eb Major", "Ab Major", "Db Major", "Gb Major", "A Minor", "E Minor",
    "B Minor", "F# Minor", "C# Minor", "G# Minor", "D# Minor", "A# Minor", "D Minor", "G Minor",
    "C Minor", "F Minor", "Bb Minor", "Eb Minor",
];

const GUESSABLE_DIFFICULTIES: [Difficulty; 4] = [
    Difficulty::Beginner,
    Difficulty::Intermediate,
    Difficulty::Advanced,
    Difficulty::Professional,
];

const FILENAME_CATEGORIES: &[(&[&str], Category)] = &[
    (&["drumline", "cadence", "snare", "bass"], Category::Drumline),
    (&["band", "orchestra", "symphony"], Category::FullBand),
    (&["film", "movie", "cinema"], Category::MediaFilm),
    (&["game", "gaming", "video"], Category::MediaGaming),
    (&["warmup", "warm-up", "exercise"], Category::Warmups),
    (&["beat", "rhythm", "pattern"], Category::Beats),
];

const FILENAME_TAGS: &[(&str, &str)] = &[
    ("march", "marching"),
    ("jazz", "jazz"),
    ("rock", "rock"),
    ("classical", "classical"),
    ("pop", "pop"),
    ("fast", "uptempo"),
    ("slow", "ballad"),
    ("competition", "competition"),
    ("concert", "concert"),
];

const FILENAME_INSTRUMENTATION: &[(&str, &str)] = &[
    ("drumline", "Snare Drums, Bass Drums, Tenor Drums, Cymbals"),
    ("band", "Full Concert Band"),
    ("orchestra", "Full Orchestra"),
    ("brass", "Brass Ensemble"),
    ("woodwind", "Woodwind Ensemble"),
];

const TEXT_CATEGORIES: &[(&[&str], Category)] = &[
    (&["drumline", "percussion", "cadence"], Category::Drumline),
    (&["orchestra", "symphony"], Category::FullBand),
    (&["film", "movie", "cinematic"], Category::MediaFilm),
];

const TEXT_DIFFICULTIES: &[(&[&str], Difficulty)] = &[
    (&["beginner", "easy", "simple"], Difficulty::Beginner),
    (&["advanced", "difficult", "complex"], Difficulty::Advanced),
    (&["professional", "virtuosic"], Difficulty::Professional),
];

const TEXT_TEMPOS: &[(&[&str], &str)] = &[
    (&["fast", "quick", "energetic"], "140"),
    (&["slow", "ballad", "gentle"], "70"),
    (&["moderate", "medium"], "120"),
];

/// Suggested values for some of the form fields. `None` means no opinion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suggestion {
    pub title: Option<String>,
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
    pub tempo: Option<String>,
    pub key_signature: Option<String>,
    pub duration: Option<String>,
    pub instrumentation: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl Suggestion {
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// The suggested fields as (form field, value) pairs.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(title) = &self.title {
            fields.push(("title", title.clone()));
        }
        if let Some(category) = self.category {
            fields.push(("category", category.to_string()));
        }
        if let Some(difficulty) = self.difficulty {
            fields.push(("difficulty", difficulty.to_string()));
        }
        if let Some(tempo) = &self.tempo {
            fields.push(("tempo", tempo.clone()));
        }
        if let Some(key) = &self.key_signature {
            fields.push(("keySignature", key.clone()));
        }
        if let Some(duration) = &self.duration {
            fields.push(("duration", duration.clone()));
        }
        if let Some(instrumentation) = &self.instrumentation {
            fields.push(("instrumentation", instrumentation.clone()));
        }
        if let Some(tags) = &self.tags {
            fields.push(("tags", tags.join(", ")));
        }
        fields
    }

    /// Overwrites the fields this suggestion has an opinion on.
    pub fn apply_to(&self, draft: &mut EntryDraft) {
        if let Some(title) = &self.title {
            draft.title = title.clone();
        }
        if let Some(category) = self.category {
            draft.category = category.label().to_string();
        }
        if let Some(difficulty) = self.difficulty {
            draft.difficulty = difficulty.label().to_string();
        }
        if let Some(tempo) = &self.tempo {
            draft.tempo = tempo.clone();
        }
        if let Some(key) = &self.key_signature {
            draft.key_signature = key.clone();
        }
        if let Some(duration) = &self.duration {
            draft.duration = duration.clone();
        }
        if let Some(instrumentation) = &self.instrumentation {
            draft.instrumentation = instrumentation.clone();
        }
        if let Some(tags) = &self.tags {
            draft.tags = tags.join(", ");
        }
    }

    /// Like `apply_to`, but leaves fields the draft already fills alone.
    pub fn fill_blanks(&self, draft: &mut EntryDraft) {
        if let Some(title) = &self.title {
            fill_blank(&mut draft.title, || title.clone());
        }
        if let Some(category) = self.category {
            fill_blank(&mut draft.category, || category.label().to_string());
        }
        if let Some(difficulty) = self.difficulty {
            fill_blank(&mut draft.difficulty, || difficulty.label().to_string());
        }
        if let Some(tempo) = &self.tempo {
            fill_blank(&mut draft.tempo, || tempo.clone());
        }
        if let Some(key) = &self.key_signature {
            fill_blank(&mut draft.key_signature, || key.clone());
        }
        if let Some(duration) = &self.duration {
            fill_blank(&mut draft.duration, || duration.clone());
        }
        if let Some(instrumentation) = &self.instrumentation {
            fill_blank(&mut draft.instrumentation, || instrumentation.clone());
        }
        if let Some(tags) = &self.tags {
            fill_blank(&mut draft.tags, || tags.join(", "));
        }
    }
}

/// Sets `field` to `value` unless it already holds something.
fn fill_blank(field: &mut String, value: impl FnOnce() -> String) {
    if field.trim().is_empty() {
        *field = value();
    }
}

fn first_match<T: Copy>(haystack: &str, rules: &[(&[&str], T)]) -> Option<T> {
    rules
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(_, value)| *value)
}

/// "cadence_no-3.mp3" -> "Cadence No 3"
pub fn title_from_filename(filename: &str) -> String {
    let stem = FILE_EXTENSION.replace(filename, "");
    let spaced = stem.replace(['-', '_'], " ");
    WORD_START
        .replace_all(&spaced, |caps: &Captures| caps[0].to_uppercase())
        .into_owned()
}

fn category_from_filename(lower: &str) -> Category {
    first_match(lower, FILENAME_CATEGORIES).unwrap_or(Category::FullBand)
}

fn tags_from_filename(lower: &str) -> Vec<String> {
    let tags: Vec<String> = FILENAME_TAGS
        .iter()
        .filter(|(keyword, _)| lower.contains(keyword))
        .map(|(_, tag)| tag.to_string())
        .collect();
    if tags.is_empty() {
        vec!["original".to_string(), "arrangement".to_string()]
    } else {
        tags
    }
}

fn instrumentation_from_filename(lower: &str) -> String {
    FILENAME_INSTRUMENTATION
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map_or("Mixed Ensemble", |(_, instrumentation)| *instrumentation)
        .to_string()
}

fn random_difficulty<R: Rng + ?Sized>(rng: &mut R) -> Option<Difficulty> {
    GUESSABLE_DIFFICULTIES.choose(rng).copied()
}

/// Guesses fields from a free-text description of a piece.
pub fn suggest_from_text(text: &str) -> Suggestion {
    let lower = text.to_lowercase();
    Suggestion {
        category: first_match(&lower, TEXT_CATEGORIES),
        difficulty: first_match(&lower, TEXT_DIFFICULTIES),
        tempo: first_match(&lower, TEXT_TEMPOS).map(str::to_string),
        ..Default::default()
    }
}

/// Guesses fields from an uploaded file. Audio and PDF files are
/// recognized; anything else yields an empty suggestion.
pub fn suggest_from_file<R: Rng + ?Sized>(
    filename: &str,
    mime_type: &str,
    rng: &mut R,
) -> Suggestion {
    let lower = filename.to_lowercase();
    if mime_type.starts_with("audio/") {
        Suggestion {
            title: Some(title_from_filename(filename)),
            tempo: Some(rng.random_range(120..180).to_string()),
            key_signature: KEYS.choose(rng).map(|key| key.to_string()),
            duration: Some(format!(
                "{}:{:02}",
                rng.random_range(2..5),
                rng.random_range(0..60)
            )),
            category: Some(category_from_filename(&lower)),
            difficulty: random_difficulty(rng),
            tags: Some(tags_from_filename(&lower)),
            ..Default::default()
        }
    } else if mime_type == "application/pdf" {
        Suggestion {
            title: Some(title_from_filename(filename)),
            category: Some(category_from_filename(&lower)),
            difficulty: random_difficulty(rng),
            instrumentation: Some(instrumentation_from_filename(&lower)),
            tags: Some(tags_from_filename(&lower)),
            ..Default::default()
        }
    } else {
        Suggestion::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_title_from_filename() {
        assert_eq!(title_from_filename("thunder-strike_v2.mp3"), "Thunder Strike V2");
        assert_eq!(title_from_filename("no extension"), "No Extension");
        assert_eq!(title_from_filename("archive.tar.gz"), "Archive.Tar");
    }

    #[test]
    fn test_text_suggestions() {
        let suggestion = suggest_from_text("A fast, energetic percussion feature. Easy parts.");
        assert_eq!(suggestion.category, Some(Category::Drumline));
        assert_eq!(suggestion.difficulty, Some(Difficulty::Beginner));
        assert_eq!(suggestion.tempo.as_deref(), Some("140"));
        assert_eq!(suggestion.title, None);

        let suggestion = suggest_from_text("Gentle cinematic theme, virtuosic solo");
        assert_eq!(suggestion.category, Some(Category::MediaFilm));
        assert_eq!(suggestion.difficulty, Some(Difficulty::Professional));
        assert_eq!(suggestion.tempo.as_deref(), Some("70"));

        assert!(suggest_from_text("nothing to see here").is_empty());
    }

    #[test]
    fn test_audio_suggestion_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let suggestion = suggest_from_file("Jazz_Cadence-fast.wav", "audio/wav", &mut rng);
            assert_eq!(suggestion.title.as_deref(), Some("Jazz Cadence Fast"));
            assert_eq!(suggestion.category, Some(Category::Drumline));
            assert_eq!(
                suggestion.tags,
                Some(vec!["jazz".to_string(), "uptempo".to_string()])
            );

            let tempo: u32 = suggestion.tempo.unwrap().parse().unwrap();
            assert!((120..180).contains(&tempo));
            assert!(KEYS.contains(&suggestion.key_signature.unwrap().as_str()));
            assert_ne!(suggestion.difficulty, Some(Difficulty::AllLevels));

            let duration = suggestion.duration.unwrap();
            let (minutes, seconds) = duration.split_once(':').unwrap();
            assert!((2..5).contains(&minutes.parse::<u32>().unwrap()));
            assert_eq!(seconds.len(), 2);
            assert!(seconds.parse::<u32>().unwrap() < 60);
        }
    }

    #[test]
    fn test_pdf_suggestion() {
        let mut rng = StdRng::seed_from_u64(1);
        let suggestion = suggest_from_file("brass-quintet.pdf", "application/pdf", &mut rng);
        assert_eq!(suggestion.title.as_deref(), Some("Brass Quintet"));
        assert_eq!(suggestion.category, Some(Category::FullBand));
        assert_eq!(suggestion.instrumentation.as_deref(), Some("Brass Ensemble"));
        assert_eq!(
            suggestion.tags,
            Some(vec!["original".to_string(), "arrangement".to_string()])
        );
        assert!(suggestion.difficulty.is_some());
        assert_eq!(suggestion.tempo, None);
    }

    #[test]
    fn test_unsupported_file_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(suggest_from_file("cover.png", "image/png", &mut rng).is_empty());
    }

    #[test]
    fn test_apply_to_fills_only_suggested_fields() {
        let mut draft = EntryDraft {
            title: "Keep".to_string(),
            tempo: "100".to_string(),
            ..Default::default()
        };
        let suggestion = Suggestion {
            category: Some(Category::MediaGaming),
            tags: Some(vec!["pop".to_string(), "concert".to_string()]),
            ..Default::default()
        };
        suggestion.apply_to(&mut draft);

        assert_eq!(draft.title, "Keep");
        assert_eq!(draft.tempo, "100");
        assert_eq!(draft.category, "Media/Gaming");
        assert_eq!(draft.tags, "pop, concert");
    }

    #[test]
    fn test_fill_blanks_keeps_existing_values() {
        let mut draft = EntryDraft {
            title: "Stored Title".to_string(),
            difficulty: "Beginner".to_string(),
            tempo: "96".to_string(),
            key_signature: "  ".to_string(),
            ..Default::default()
        };
        let suggestion = Suggestion {
            title: Some("Random Guess".to_string()),
            difficulty: Some(Difficulty::Professional),
            tempo: Some("171".to_string()),
            key_signature: Some("F# Minor".to_string()),
            duration: Some("3:12".to_string()),
            ..Default::default()
        };
        suggestion.fill_blanks(&mut draft);

        assert_eq!(draft.title, "Stored Title");
        assert_eq!(draft.difficulty, "Beginner");
        assert_eq!(draft.tempo, "96");
        assert_eq!(draft.key_signature, "F# Minor");
        assert_eq!(draft.duration, "3:12");
    }
}
