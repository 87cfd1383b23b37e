pub mod memory;
pub mod traits;

// Re-export for convenience
pub use memory::{
    MemoryParameterPort, MemoryTimelinePort, MemoryTransport, MemoryTransportFactory,
    RecordingCodePort, SentMessage,
};
pub use traits::{
    CodeExecutionPort, MessageTransportFactory, MessageTransportPort, ParameterInfo,
    ParameterPort, ParameterStyle, PersistencePort, TimelineControlPort, TimelineOp,
    TimelineStatus,
};
