//! Web presentation: article markup and page templates.

pub mod markup;
pub mod page;

pub use markup::{escape_html, render_body};
