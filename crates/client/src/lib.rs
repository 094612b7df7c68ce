// quire-client: document service client and the workspace editing state machine.

pub mod api;
pub mod autosave;
pub mod config;
pub mod session;
pub mod view;
pub mod workspace;
