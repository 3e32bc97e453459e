//! Messaging module: chunk segmentation, post-generation transforms, and the
//! outbound response channel.
//!
//! Generated text flows `segmenter` → `filter` → `response`: it is cut into
//! word-aligned chunks, each chunk is rewritten by the transform chain, and
//! the result is emitted on the request's `FINAL_RESPONSE` stream.

pub mod filter;
pub mod response;
pub mod segmenter;

pub use filter::{FilterError, ReplacementFilter, TextTransform, TransformChain};
pub use response::{ResponseError, ResponseEvent, ResponseHandler, TextStream};
pub use segmenter::{segment, Segmenter};
