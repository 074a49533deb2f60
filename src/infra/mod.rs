pub mod changes_file;
pub mod logging;
pub mod tracker;
pub mod xml;
