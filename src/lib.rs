#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use xr_conf as conf;
pub use xr_serde as serde;
pub use xr_utils as utils;
