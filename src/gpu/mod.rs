//! Device collaborators.
//!
//! The crate never talks to a graphics API directly; backends implement the
//! traits in [`traits`]. A host-memory reference backend lives in [`dummy`]
//! and is what the tests and benches run against.

// Always present: traits define the interface
pub mod traits;
pub use traits::{
    CompletionCounter, DeviceContext, GpuError, MapOutcome, MappedSubresource, RenderDevice,
    ResourceHandle, StaleObject,
};

pub mod deferred;
pub use deferred::DeferredReleaseQueue;

pub mod fence;
pub use fence::FenceCounter;

// Reference device for testing (always available)
pub mod dummy;
pub use dummy::{CopyRecord, DummyContext, DummyDevice};
