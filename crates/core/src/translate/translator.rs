use async_trait::async_trait;

use crate::language::LanguageCode;
use crate::translate::types::{Cue, TranslateError};

/// The external AI translation capability the core consumes (spec §1: "agnostic to who
/// provides it"). Implementations decide their own batch size; the singleflight builder
/// just iterates whatever batches come back.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate_batches(
        &self,
        cues: &[Cue],
        target_lang: LanguageCode,
    ) -> Result<Vec<Vec<Cue>>, TranslateError>;
}
