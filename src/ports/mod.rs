//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the diagram core and an
//! external system (time, filesystem, IDs, the cache store, the
//! source-control API, the generation backend, credential storage).
//! Implementations live in `src/adapters/` and `src/store/`.

pub mod backend;
pub mod cache;
pub mod clock;
pub mod credentials;
pub mod filesystem;
pub mod id_gen;
pub mod source_control;

pub use backend::{
    ByteStream, CostEstimate, CostFuture, CostRequest, GenerationBackend, GenerationRequest,
    StreamFuture,
};
pub use cache::{
    CachePage, DiagramCache, DiagramRecord, DiagramWrite, ListQuery, Pagination, RepoKey,
    SortDirection, SortField,
};
pub use clock::Clock;
pub use credentials::{CredentialStore, Credentials, ModelConfig};
pub use filesystem::FileSystem;
pub use id_gen::IdGenerator;
pub use source_control::{BranchFuture, BranchHead, SourceControl};
