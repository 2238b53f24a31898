#[macro_use]
extern crate log;
#[macro_use]
extern crate derive_builder;
#[macro_use]
extern crate lazy_static;

pub mod browser_session;
pub mod crawler;
pub mod export;
pub mod extract;
pub mod http_session;
pub mod profile;
pub mod runner;
pub mod types;
pub mod utils;
