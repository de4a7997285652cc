#![allow(dead_code)]

pub mod github;

pub use github::{
    InstantTimer, create_checker, create_test_cache, record, release, releases_body, start_time,
};
