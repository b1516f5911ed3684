//! Fixture Registry: named inputs shipped with the crate
use crate::RegistryError;
use fourtwo_core::Fixture;
use serde::Deserialize;

const EMBEDDED: &str = include_str!("../fixtures/health-coach.yaml");

#[derive(Debug, Deserialize)]
struct FixtureFile {
    fixtures: Vec<Fixture>,
}

#[derive(Debug, Clone, Default)]
pub struct FixtureRegistry {
    fixtures: Vec<Fixture>,
}

impl FixtureRegistry {
    /// The health-coach fixtures compiled into the binary
    pub fn embedded() -> Result<Self, RegistryError> {
        Self::from_yaml(EMBEDDED)
    }

    pub fn from_yaml(source: &str) -> Result<Self, RegistryError> {
        let file: FixtureFile = serde_yaml::from_str(source)?;
        let mut registry = Self::default();
        for fixture in file.fixtures {
            if registry.get(&fixture.id).is_some() {
                return Err(RegistryError::DuplicateFixture(fixture.id));
            }
            registry.fixtures.push(fixture);
        }
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&Fixture> {
        self.fixtures.iter().find(|f| f.id == id)
    }

    pub fn list(&self) -> &[Fixture] {
        &self.fixtures
    }
}
