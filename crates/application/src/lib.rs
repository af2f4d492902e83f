#![forbid(unsafe_code)]

pub mod acl_service_impl;
