pub mod queries;
pub mod routes;

pub use queries::{ListRowsError, ListRowsQuery, ListRowsResponse, TableRow};
pub use routes::tables_routes;
