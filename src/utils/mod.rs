pub mod buildval_toml;
pub mod config;
pub mod fd_limit;
pub mod logger;

pub use buildval_toml::{
    BuildvalToml, ToolsSection, apply_file_to_opts, load_config_file, parse_config,
};
pub use config::*;
pub use fd_limit::{FDS_PER_UNIT, cap_by_fd_limit, max_open_fds};
pub use logger::setup_logging;
