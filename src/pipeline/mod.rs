pub mod dispatcher;
pub mod fusion;
pub mod indicators;
pub mod snapshot;
pub mod synthesizer;
