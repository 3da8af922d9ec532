// Core services for survey coordination

pub mod caller;
pub mod channel_registry;
pub mod identity;
pub mod leader;
pub mod managed_stream;
pub mod memory_cluster;

// Re-export commonly used types
pub use caller::{SurveyCaller, SurveyContext};
pub use channel_registry::ChannelHandlerRegistry;
pub use identity::MemoryIdentityStore;
pub use leader::MemoryLeaderManager;
pub use managed_stream::MemoryManagedStreams;
pub use memory_cluster::{MemoryCluster, MemoryNode};
