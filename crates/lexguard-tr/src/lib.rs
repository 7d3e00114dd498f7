//! Obfuscation-tolerant restricted-term detection for Turkish text.
//!
//! [`engine::DetectionEngine`] normalizes text into tokens and resolves each
//! one through a TTL match cache, exact lexicon lookup and a probe over
//! generated spelling variations. Variants confirmed by the probe are stored
//! back into the lexicon in the background, and the substitution rules they
//! reveal are learned and replayed on later probes.
//!
//! The lexicon itself sits behind [`lexicon::LexiconStore`];
//! [`lexicon::InMemoryLexicon`] is the bundled implementation.

pub mod cache;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod enrichment;
pub mod learner;
pub mod lexicon;
pub mod normalizer;
pub mod stats;
pub mod variation;

pub use engine::{DetectionEngine, DetectionEngineBuilder, EngineError};
