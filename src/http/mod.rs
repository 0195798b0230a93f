//! HTTP protocol layer module
//!
//! Response construction shared by the router and the error mapping.

pub mod response;

pub use response::{
    apply_common_headers, build_404_response, build_405_response, build_detail_response,
    build_health_response, build_options_response, build_redirect_response, json_response,
};
