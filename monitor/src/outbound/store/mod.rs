//! Monitor store adapters.

mod file;
mod memory;
mod state;

pub use file::JsonFileMonitorStore;
pub use memory::InMemoryMonitorStore;
pub use state::MonitorState;
