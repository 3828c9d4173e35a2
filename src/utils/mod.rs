pub mod constants;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{
    is_absolute_url, is_restricted_surface, pdf_data_url, resolve_against, split_base64_data_url,
};
