pub mod store;

pub use store::{AlertStore, FileAlertStore, MemoryAlertStore, StoreResult};
