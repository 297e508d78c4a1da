//! Helper functions for templates
//!
//! URL generation, HTML snippets and date formatting shared by the
//! templates, the render pipeline and the commands.

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
