//! 人设 DTO

use serde::Serialize;

use crate::models::persona::Persona;

/// 人设列表项
#[derive(Debug, Serialize)]
pub struct PersonaSummaryResponse {
    pub id: String,
    pub label: String,
    pub persona_traits: Vec<String>,
    pub objection_count: usize,
    pub baseline_cooperation: u8,
}

impl From<&Persona> for PersonaSummaryResponse {
    fn from(persona: &Persona) -> Self {
        Self {
            id: persona.id.clone(),
            label: persona.label.clone(),
            persona_traits: persona.persona_traits.clone(),
            objection_count: persona.objection_patterns.len(),
            baseline_cooperation: persona.baseline_cooperation,
        }
    }
}

/// 人设列表响应
#[derive(Debug, Serialize)]
pub struct PersonaListResponse {
    pub personas: Vec<PersonaSummaryResponse>,
    pub total: usize,
}
