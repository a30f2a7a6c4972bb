pub mod config;
pub mod envelope;
pub mod pagination;

pub use config::PaginationPolicy;
pub use envelope::{PageMeta, Paginated, SearchPage};
pub use pagination::{coerce_int, window, PageRequest, Window};
