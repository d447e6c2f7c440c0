pub mod exporter;
pub mod flattener;
pub mod plugins;

pub use exporter::Exporter;
pub use flattener::TreeFlattener;
