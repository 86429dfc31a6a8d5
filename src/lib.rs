pub mod config;
pub mod logger;
pub mod pipeline;
pub mod post;
pub mod post_list;
pub mod graph;
pub mod taxonomy;
pub mod validation;
pub mod paginator;
pub mod collection;
pub mod content;
pub mod slug;
pub mod text_utils;
mod test_data;
