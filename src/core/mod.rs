pub mod ancestry;
pub mod broken_branch;
pub mod bypass;
pub mod commitguard;
pub mod conventional;
pub mod maturity;
pub mod pagination;
pub mod rerun;
pub mod runner;
pub mod settings;
pub mod stub_sync;
pub mod tag_resolver;
pub mod title_check;

pub use crate::domain::model::{GateStatus, Page, RepoId};
pub use crate::domain::ports::{ChatNotifier, GitWriter, RepositoryAdmin, SchemaStore, ServiceCatalog, SourceControl};
pub use crate::utils::error::Result;
