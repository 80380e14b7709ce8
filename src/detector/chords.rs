// Chord Matching - Scores detected pitch classes against chord templates
// Curated open-position chords are tried first, generic formulas second

use serde::{Deserialize, Serialize};

use crate::music::{ChordQuality, ChordSymbol, PitchClass};

/// Fraction of a template's notes that must be present to count as a match
pub const MATCH_THRESHOLD: f32 = 0.66;

/// Number of matches returned to callers
pub const MAX_MATCHES: usize = 3;

/// A chord and the pitch classes it contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordTemplate {
    pub display_name: String,
    pub symbol: ChordSymbol,
    pub pitch_classes: Vec<PitchClass>,
}

impl ChordTemplate {
    pub fn from_symbol(symbol: ChordSymbol) -> Self {
        Self {
            display_name: symbol.to_string(),
            symbol,
            pitch_classes: symbol.pitch_classes(),
        }
    }

    /// Score a set of detected notes against this template
    pub fn score(&self, notes: &[PitchClass]) -> ChordMatch {
        let matched_notes: Vec<PitchClass> = self
            .pitch_classes
            .iter()
            .copied()
            .filter(|pc| notes.contains(pc))
            .collect();
        let confidence = matched_notes.len() as f32 / self.pitch_classes.len() as f32;

        ChordMatch {
            label: self.display_name.clone(),
            root: self.symbol.root,
            quality: self.symbol.quality,
            confidence,
            matched_notes,
        }
    }
}

/// A ranked chord guess
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordMatch {
    /// Display label, e.g. "Am"
    pub label: String,

    pub root: PitchClass,
    pub quality: ChordQuality,

    /// matched / template notes (0.0 - 1.0)
    pub confidence: f32,

    /// Template notes that were present, in template order
    pub matched_notes: Vec<PitchClass>,
}

/// Common open-position guitar chords, in matching order
pub fn curated_templates() -> Vec<ChordTemplate> {
    use PitchClass::*;

    let naturals = [C, D, E, F, G, A, B];
    let sevenths = [G, C, D, E, A, B];

    naturals
        .iter()
        .map(|&root| ChordSymbol::major(root))
        .chain(naturals.iter().map(|&root| ChordSymbol::minor(root)))
        .chain(
            sevenths
                .iter()
                .map(|&root| ChordSymbol::new(root, ChordQuality::Dominant7)),
        )
        .map(ChordTemplate::from_symbol)
        .collect()
}

/// Generic templates: every detected note as a root, every quality formula
pub fn generic_templates(roots: &[PitchClass]) -> Vec<ChordTemplate> {
    roots
        .iter()
        .flat_map(|&root| {
            ChordQuality::ALL
                .iter()
                .map(move |&quality| ChordTemplate::from_symbol(ChordSymbol::new(root, quality)))
        })
        .collect()
}

fn score_all(templates: &[ChordTemplate], notes: &[PitchClass]) -> Vec<ChordMatch> {
    templates
        .iter()
        .map(|template| template.score(notes))
        .filter(|m| m.confidence >= MATCH_THRESHOLD)
        .collect()
}

/// Rank detected notes against chord templates.
///
/// Needs at least two distinct notes. Ordering is confidence descending, then
/// more matched notes first, then template definition order.
pub fn match_chord(notes: &[PitchClass]) -> Vec<ChordMatch> {
    let mut unique: Vec<PitchClass> = Vec::with_capacity(notes.len());
    for &note in notes {
        if !unique.contains(&note) {
            unique.push(note);
        }
    }

    if unique.len() < 2 {
        return Vec::new();
    }

    let mut matches = score_all(&curated_templates(), &unique);
    if matches.is_empty() {
        matches = score_all(&generic_templates(&unique), &unique);
    }

    // Stable sort keeps definition order for exact ties
    matches.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.matched_notes.len().cmp(&a.matched_notes.len()))
    });
    matches.truncate(MAX_MATCHES);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use PitchClass::*;

    #[test]
    fn test_full_triad_ranks_first() {
        let matches = match_chord(&[C, E, G]);
        assert_eq!(matches[0].label, "C");
        assert_eq!(matches[0].confidence, 1.0);
        assert_eq!(matches[0].matched_notes, vec![C, E, G]);
        assert!(matches.len() <= MAX_MATCHES);
    }

    #[test]
    fn test_partial_triad_meets_threshold() {
        let matches = match_chord(&[C, E]);
        let c_major = matches.iter().find(|m| m.label == "C").unwrap();
        assert!((c_major.confidence - 0.667).abs() < 0.01);
        assert!(c_major.confidence >= MATCH_THRESHOLD);
    }

    #[test]
    fn test_single_note_is_empty() {
        assert!(match_chord(&[A]).is_empty());
        assert!(match_chord(&[A, A, A]).is_empty());
        assert!(match_chord(&[]).is_empty());
    }

    #[test]
    fn test_seventh_beats_partial_triads() {
        let matches = match_chord(&[G, B, D, F]);
        assert_eq!(matches[0].label, "G7");
        assert_eq!(matches[0].confidence, 1.0);
        // G major is fully contained too
        assert!(matches.iter().any(|m| m.label == "G" && m.confidence == 1.0));
    }

    #[test]
    fn test_tie_break_is_definition_order() {
        // C and Am both match two of three notes; C is defined first
        let matches = match_chord(&[C, E]);
        assert_eq!(matches[0].label, "C");
        assert_eq!(matches[1].label, "Am");
        assert_eq!(match_chord(&[E, C]), matches);
    }

    #[test]
    fn test_generic_fallback() {
        // No curated chord contains both F# and C#
        let matches = match_chord(&[FSharp, CSharp]);
        assert!(!matches.is_empty());
        let power = matches.iter().find(|m| m.label == "F#5").unwrap();
        assert_eq!(power.confidence, 1.0);
        assert_eq!(matches[0].label, "F#5");
    }

    #[test]
    fn test_curated_skips_generic() {
        let matches = match_chord(&[A, C, E]);
        assert_eq!(matches[0].label, "Am");
        // Generic labels such as "Am7" never appear once a curated chord matched
        assert!(matches.iter().all(|m| m.quality != ChordQuality::Minor7));
    }

    #[test]
    fn test_curated_table_shape() {
        let curated = curated_templates();
        assert_eq!(curated.len(), 20);
        assert_eq!(curated[0].display_name, "C");
        assert_eq!(curated[7].display_name, "Cm");
        assert_eq!(curated[7].pitch_classes, vec![C, DSharp, G]);
        assert_eq!(curated[14].display_name, "G7");
    }
}
