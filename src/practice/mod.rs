// Practice - Ear-training quizzes

pub mod ear_training;

pub use ear_training::{
    ChordKind, DifficultyTier, EarTrainingQuestion, IntervalKind, ScaleKind, ScoreBoard,
    TrainingMode, CHORD_KINDS, INTERVALS, SCALE_KINDS,
};
