//! Client code for api2md.
//!
//! This crate provides page retrieval (headless browser or plain HTTP),
//! disclosure expansion, content extraction, Markdown rendering and the
//! conversion orchestrator used by the CLI.

pub mod convert;
pub mod extract;
pub mod fetch;
pub mod render;

pub use convert::{BatchItem, BatchReport, BatchSummary, ConvertConfig, Converted, Converter, ItemStatus};
pub use extract::{
    Block, Endpoint, ExtractConfig, HttpMethod, MarkdownDocument, PreparedDocument, extract_document, prepare_document,
    render_markdown,
};
pub use fetch::{FetchClient, FetchConfig, FetchResponse};
#[cfg(feature = "render")]
pub use render::HeadlessRenderer;
pub use render::{PageSource, RenderOptions, RenderedPage, StaticSource};
