// Genre Templates - Static pattern rows for the backing track
// Adding a genre means authoring a new row here, not new logic

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Steps in one drum bar (sixteenth notes of a 4/4 measure)
pub const STEPS_PER_MEASURE: usize = 16;

/// Backing-track style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    /// Rock - kick on 1/3, snare on 2/4, straight eighth hats
    Rock,

    /// Blues - shuffle-leaning kick, offbeat hats
    Blues,

    /// Jazz - sparse kick, triplet-ish hats, offbeat comping
    Jazz,

    /// Pop - four on the floor with sixteenth hats
    Pop,

    /// Funk - syncopated kick and ghost snares
    Funk,

    /// Reggae - offbeat skank
    Reggae,

    /// Country - root-fifth bass, strums on 2 and 4
    Country,
}

impl Genre {
    pub const ALL: [Genre; 7] = [
        Genre::Rock,
        Genre::Blues,
        Genre::Jazz,
        Genre::Pop,
        Genre::Funk,
        Genre::Reggae,
        Genre::Country,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Rock => "rock",
            Genre::Blues => "blues",
            Genre::Jazz => "jazz",
            Genre::Pop => "pop",
            Genre::Funk => "funk",
            Genre::Reggae => "reggae",
            Genre::Country => "country",
        }
    }

    /// Pattern row for this genre
    pub fn pattern(&self) -> &'static PatternSpec {
        match self {
            Genre::Rock => &ROCK,
            Genre::Blues => &BLUES,
            Genre::Jazz => &JAZZ,
            Genre::Pop => &POP,
            Genre::Funk => &FUNK,
            Genre::Reggae => &REGGAE,
            Genre::Country => &COUNTRY,
        }
    }
}

impl Default for Genre {
    fn default() -> Self {
        Genre::Rock
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|genre| genre.as_str() == wanted)
            .ok_or_else(|| format!("Unknown genre: {}", s))
    }
}

/// A bass note relative to the measure's chord root
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BassStep {
    /// Semitones above (or below) the root
    pub semitones: i32,

    /// Beat within the measure (quarter-note units)
    pub beat: f64,
}

const fn bass(semitones: i32, beat: f64) -> BassStep {
    BassStep { semitones, beat }
}

/// One genre's row: sixteen-step drum lanes, bass figure and strum beats.
///
/// Drum lanes are written as `x` (hit) and `.` (rest), one character per
/// sixteenth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternSpec {
    pub genre: Genre,
    pub kick: &'static str,
    pub snare: &'static str,
    pub hihat: &'static str,
    pub bass: &'static [BassStep],

    /// Beats on which the rhythm chord is strummed
    pub strum_beats: &'static [f64],
}

impl PatternSpec {
    pub fn kick_steps(&self) -> [bool; STEPS_PER_MEASURE] {
        lane_steps(self.kick)
    }

    pub fn snare_steps(&self) -> [bool; STEPS_PER_MEASURE] {
        lane_steps(self.snare)
    }

    pub fn hihat_steps(&self) -> [bool; STEPS_PER_MEASURE] {
        lane_steps(self.hihat)
    }
}

fn lane_steps(lane: &str) -> [bool; STEPS_PER_MEASURE] {
    let mut steps = [false; STEPS_PER_MEASURE];
    for (step, symbol) in steps.iter_mut().zip(lane.chars()) {
        *step = symbol == 'x';
    }
    steps
}

static ROCK: PatternSpec = PatternSpec {
    genre: Genre::Rock,
    kick: "x...x...x...x...",
    snare: "....x.......x...",
    hihat: "x.x.x.x.x.x.x.x.",
    bass: &[
        bass(0, 0.0),
        bass(4, 0.5),
        bass(0, 1.0),
        bass(4, 1.5),
        bass(0, 2.0),
        bass(4, 2.5),
        bass(0, 3.0),
        bass(4, 3.5),
    ],
    strum_beats: &[0.0, 2.0],
};

static BLUES: PatternSpec = PatternSpec {
    genre: Genre::Blues,
    kick: "x.....x...x.....",
    snare: "....x.......x...",
    hihat: "..x...x...x...x.",
    bass: &[
        bass(0, 0.0),
        bass(0, 0.5),
        bass(4, 1.0),
        bass(5, 1.5),
        bass(4, 2.0),
        bass(0, 2.5),
        bass(0, 3.0),
        bass(-2, 3.5),
    ],
    strum_beats: &[0.0, 1.0, 2.0, 3.0],
};

static JAZZ: PatternSpec = PatternSpec {
    genre: Genre::Jazz,
    kick: "x.........x.....",
    snare: "....x.......x...",
    hihat: "x..x..x..x..x..x",
    bass: &[bass(0, 0.0), bass(2, 1.0), bass(4, 2.0), bass(5, 3.0)],
    strum_beats: &[0.5, 1.5, 2.5, 3.5],
};

static POP: PatternSpec = PatternSpec {
    genre: Genre::Pop,
    kick: "x...x...x...x...",
    snare: "....x.......x...",
    hihat: "xxxxxxxxxxxxxxxx",
    bass: &[bass(0, 0.0), bass(0, 1.0), bass(0, 2.0), bass(0, 3.0)],
    strum_beats: &[0.0, 1.0, 2.0, 3.0],
};

static FUNK: PatternSpec = PatternSpec {
    genre: Genre::Funk,
    kick: "x..x..x...x..x..",
    snare: "....x..x....x...",
    hihat: "x.xxx.xxx.xxx.xx",
    bass: &[
        bass(0, 0.0),
        bass(0, 0.25),
        bass(-12, 0.5),
        bass(0, 0.75),
        bass(0, 1.0),
        bass(3, 1.5),
        bass(0, 2.0),
        bass(0, 2.5),
        bass(5, 3.0),
        bass(3, 3.5),
    ],
    strum_beats: &[0.5, 1.0, 2.5, 3.0],
};

static REGGAE: PatternSpec = PatternSpec {
    genre: Genre::Reggae,
    kick: "..x...x...x...x.",
    snare: "....x.......x...",
    hihat: "..x...x...x...x.",
    bass: &[bass(0, 0.5), bass(0, 1.5), bass(0, 2.5), bass(0, 3.5)],
    strum_beats: &[0.5, 2.5],
};

static COUNTRY: PatternSpec = PatternSpec {
    genre: Genre::Country,
    kick: "x...x...x...x...",
    snare: "....x.......x...",
    hihat: "x.x.x.x.x.x.x.x.",
    bass: &[bass(0, 0.0), bass(7, 1.0), bass(0, 2.0), bass(7, 3.0)],
    strum_beats: &[1.0, 3.0],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_from_str() {
        assert_eq!("Reggae".parse::<Genre>().unwrap(), Genre::Reggae);
        assert!("polka".parse::<Genre>().is_err());
    }

    #[test]
    fn test_rows_are_well_formed() {
        for genre in Genre::ALL {
            let row = genre.pattern();
            assert_eq!(row.genre, genre);
            for lane in [row.kick, row.snare, row.hihat] {
                assert_eq!(lane.len(), STEPS_PER_MEASURE, "{} lane length", genre);
                assert!(lane.chars().all(|c| c == 'x' || c == '.'));
            }
            assert!(!row.bass.is_empty());
            assert!(row.bass.iter().all(|b| (0.0..4.0).contains(&b.beat)));
            assert!(row.strum_beats.iter().all(|b| (0.0..4.0).contains(b)));
        }
    }

    #[test]
    fn test_rock_row() {
        let rock = Genre::Rock.pattern();
        let kicks: Vec<usize> = rock
            .kick_steps()
            .iter()
            .enumerate()
            .filter_map(|(i, hit)| hit.then_some(i))
            .collect();
        assert_eq!(kicks, vec![0, 4, 8, 12]);

        let snares: Vec<usize> = rock
            .snare_steps()
            .iter()
            .enumerate()
            .filter_map(|(i, hit)| hit.then_some(i))
            .collect();
        // Beats 2 and 4
        assert_eq!(snares, vec![4, 12]);
        assert_eq!(rock.hihat_steps().iter().filter(|h| **h).count(), 8);
    }

    #[test]
    fn test_reggae_skank_offbeat() {
        let reggae = Genre::Reggae.pattern();
        assert!(reggae.strum_beats.iter().all(|b| b.fract() == 0.5));
    }
}
