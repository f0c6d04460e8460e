pub mod catalog_store;
pub mod dataset_cache;
pub mod object_store;

pub use catalog_store::{parse_pure_flag, CatalogSet, CatalogTable, ColumnKind};
pub use dataset_cache::DatasetCache;
pub use object_store::{DatasetFragment, ObjectRecord, ObjectStore, PartitionedDataset};
