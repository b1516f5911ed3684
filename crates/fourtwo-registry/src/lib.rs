//! FourTwo Registry: static block and fixture catalogues
pub mod block_registry;
pub mod fixtures;

pub use block_registry::{BlockInfo, BlockRegistry, StageSelection, Unresolved};
pub use fixtures::FixtureRegistry;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("FIXTURE/PARSE: {0}")]
    FixtureParse(#[from] serde_yaml::Error),

    #[error("FIXTURE/DUPLICATE: {0}")]
    DuplicateFixture(String),
}
