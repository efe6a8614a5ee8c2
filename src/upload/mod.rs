//! Staging upload pipeline.
//!
//! - [`desc`] and [`format`]: what a staging texture looks like
//! - [`buffer`]: one staging texture and its *Mapped* / *CopyScheduled* gates
//! - [`cache`]: idle mapped buffers keyed by descriptor
//! - [`pipeline`]: pending operations and the render-thread pump
//! - [`pool`]: the producer-facing entry point
//!
//! ## Buffer lifecycle
//!
//! ```text
//! acquire ──► Map ──► mapped ──► schedule_gpu_copy ──► Copy ──► copy scheduled
//!    ▲                                                               │
//!    └──────── idle cache ◄── MapAndCache ◄──────── recycle ◄────────┘
//! ```

pub mod buffer;
pub mod cache;
pub mod desc;
pub mod format;
pub mod pipeline;
pub mod pool;

pub use buffer::UploadBuffer;
pub use cache::BufferCache;
pub use desc::{calc_subresource, UploadBufferDesc};
pub use format::{FormatInfo, TextureFormat};
pub use pipeline::{BufferOperation, CopyTarget, PendingCounts, UploadPipeline};
pub use pool::UploadBufferPool;
