//! Pagenote Scheduler Library
//!
//! Cooperative primitives for the interaction thread: cancellation tokens
//! tied to a component's lifetime, and a per-frame coalescer that keeps only
//! the latest value pushed between two frame ticks.
//!
//! # Example
//!
//! ```
//! use pagenote_scheduler::{CancellationRegistry, FrameCoalescer};
//!
//! let mut registry = CancellationRegistry::new();
//! let token = registry.register("annotation-1");
//!
//! let mut moves = FrameCoalescer::new();
//! moves.push((110.0, 100.0));
//! moves.push((130.0, 100.0));
//! assert_eq!(moves.tick(), Some((130.0, 100.0)));
//!
//! // Tearing down the owner cancels whatever it was listening for.
//! registry.cancel(&"annotation-1");
//! assert!(token.is_cancelled());
//! ```

mod cancel;
mod frame;

pub use cancel::{CancellationRegistry, CancellationToken};
pub use frame::FrameCoalescer;
