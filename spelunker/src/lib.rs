// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    format_done_event, format_stream_event, load_names_from_file, load_names_from_source,
    output_path_for, parse_graph_name, resolve_output_path,
};

// Re-export exploration functionality from spelunker-core
pub use spelunker_core::explore::{ExplorationOutcome, ExploreOptions, execute_exploration};
