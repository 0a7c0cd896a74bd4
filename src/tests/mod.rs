//! Crate-level tests
//!
//! `fixtures` holds the scripted collaborators shared with the unit tests in
//! `transcode`. `scenarios` drives whole pipelines through them; `e2e` runs
//! a real file through FFmpeg.


mod scenarios;
