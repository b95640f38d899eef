// src/lib.rs — Library root for livecap

pub mod api;
pub mod capture;
pub mod cli;
pub mod clips;
pub mod core;
pub mod highlights;
pub mod infra;
pub mod jobs;
pub mod media;
pub mod notify;
pub mod pipeline;
pub mod platform;
pub mod util;
