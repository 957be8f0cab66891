pub mod list;

pub use list::{ListRowsError, ListRowsQuery, ListRowsResponse, TableRow};
