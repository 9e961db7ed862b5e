//! 人设注册表
//!
//! 启动时从目录加载全部人设 JSON，并与话术目录交叉校验。加载后只读。

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::catalog::Catalog;
use crate::error::{AppError, Result};
use crate::models::persona::Persona;

/// 只读人设集合（按 ID 排序）
#[derive(Debug, Clone, Default)]
pub struct PersonaRegistry {
    personas: BTreeMap<String, Arc<Persona>>,
}

impl PersonaRegistry {
    /// 由已解析的人设构建，校验 ID 唯一以及魔法话术引用
    pub fn from_personas(personas: Vec<Persona>, catalog: &Catalog) -> Result<Self> {
        let mut map = BTreeMap::new();
        for persona in personas {
            persona.validate()?;
            check_magic_phrases(&persona, catalog)?;
            let id = persona.id.clone();
            if map.insert(id.clone(), Arc::new(persona)).is_some() {
                return Err(AppError::Configuration(format!(
                    "duplicate persona id '{}'",
                    id
                )));
            }
        }
        Ok(Self { personas: map })
    }

    /// 加载目录下所有 `*.json` 文件
    pub fn load_dir(dir: impl AsRef<Path>, catalog: &Catalog) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| {
            AppError::Configuration(format!(
                "cannot read personas directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let personas = paths
            .iter()
            .map(Persona::load)
            .collect::<Result<Vec<_>>>()?;
        if personas.is_empty() {
            return Err(AppError::Configuration(format!(
                "no persona files in {}",
                dir.display()
            )));
        }

        let registry = Self::from_personas(personas, catalog)?;
        info!(
            dir = %dir.display(),
            count = registry.len(),
            "Loaded personas"
        );
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Persona>> {
        self.personas.get(id).cloned()
    }

    /// 查找人设，不存在时返回 NotFound
    pub fn require(&self, id: &str) -> Result<Arc<Persona>> {
        self.get(id)
            .ok_or_else(|| AppError::NotFound(format!("Persona not found: {}", id)))
    }

    pub fn list(&self) -> Vec<Arc<Persona>> {
        self.personas.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

fn check_magic_phrases(persona: &Persona, catalog: &Catalog) -> Result<()> {
    for objection in &persona.objection_patterns {
        if let Some(missing) = objection
            .magic_phrases
            .iter()
            .find(|id| catalog.magic_phrase(id).is_none())
        {
            return Err(AppError::Configuration(format!(
                "objection '{}' of persona '{}' references unknown magic phrase '{}'",
                objection.id, persona.id, missing
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::catalog;
    use crate::models::persona::fixtures;

    #[test]
    fn test_registry_lookup() {
        let registry = PersonaRegistry::from_personas(vec![fixtures::investor()], &catalog()).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("investor").is_some());
        assert!(matches!(registry.require("nobody"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_unknown_magic_phrase_rejected() {
        let mut persona = fixtures::investor();
        persona.objection_patterns[0].magic_phrases = vec!["no_such_phrase".into()];
        let err = PersonaRegistry::from_personas(vec![persona], &catalog()).unwrap_err();
        assert!(matches!(err, AppError::Configuration(msg) if msg.contains("no_such_phrase")));
    }

    #[test]
    fn test_known_magic_phrase_accepted() {
        let mut persona = fixtures::investor();
        persona.objection_patterns[0].magic_phrases = vec!["most_people_tell_me".into()];
        assert!(PersonaRegistry::from_personas(vec![persona], &catalog()).is_ok());
    }

    #[test]
    fn test_duplicate_persona_rejected() {
        let err = PersonaRegistry::from_personas(
            vec![fixtures::investor(), fixtures::investor()],
            &catalog(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_missing_directory_is_configuration_error() {
        let err = PersonaRegistry::load_dir("/nonexistent/personas", &catalog()).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }
}
