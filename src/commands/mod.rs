pub mod servers;

// Re-export command functions for convenience
pub use servers::{
    create, due, exists, format_timestamp, init, list, offline, online, parse_client, remove,
    show,
};
