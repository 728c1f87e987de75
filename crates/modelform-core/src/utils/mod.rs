//! Utility types shared by the model and forms layers.
//!
//! - [`MultiValueDict`] - a dictionary with multiple values per key
//! - [`QueryDict`] - decoded form submissions built on `MultiValueDict`
//! - [`html`] - escaping and attribute rendering

pub mod html;
pub mod multi_value_dict;
pub mod query_dict;

pub use html::{escape_html, html_params};
pub use multi_value_dict::MultiValueDict;
pub use query_dict::QueryDict;
