#[macro_use]
extern crate lazy_static;

mod common;
mod deploy_tests;
