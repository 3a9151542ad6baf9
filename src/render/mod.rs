//! Response rendering.
//!
//! Every convert response (success or error) flows through a template.
//! Templates receive the conversion outcome plus a `response` control
//! object whose methods mutate the eventual HTTP response directly, which
//! lets operators reshape status, headers, and body without touching code.

mod control;
pub mod funcs;
mod registry;

pub use control::{ResponseControl, ResponseSink};
pub use registry::{
    DEFAULT_TEMPLATE_NAME, RenderError, TemplateArgs, TemplateRegistry,
};
