// quire-common: shared types for the Quire server, client, and CLI.

pub mod markdown;
pub mod protocol;
pub mod types;
