#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use cfr_coach::catalog::Catalog;
use cfr_coach::scoring::ConversationScorer;
use cfr_coach::services::PersonaRegistry;

/// A turn that hits every CFR step: acknowledge, open isolation,
/// Feel-Felt-Found with social proof, and a two-option close
pub const STRONG_TURN: &str = "Perfect, you're right to focus on that. Besides that, is there \
     anything else? I know how you feel, my clients have felt the same, and what they found was \
     the numbers work. Which works better, Tuesday or Thursday?";

pub fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

pub fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::load(data_dir().join("catalog.json")).expect("shipped catalog"))
}

pub fn registry(catalog: &Catalog) -> Arc<PersonaRegistry> {
    Arc::new(PersonaRegistry::load_dir(data_dir().join("personas"), catalog).expect("shipped personas"))
}

pub fn scorer() -> (Arc<ConversationScorer>, Arc<PersonaRegistry>) {
    let catalog = catalog();
    let registry = registry(&catalog);
    (Arc::new(ConversationScorer::new(catalog)), registry)
}
