// MSSQL module - blocking SQL Server sessions on top of tiberius
//
// - client: TDS client creation from a ConnectionConfig
// - params: parameter conversion for bound statements
// - query: result value conversion and column metadata
// - connection: the Connection implementation
// - cursor: buffered cursors
// - statement: `?` statements rewritten to `@Pn`

mod client;
mod connection;
mod cursor;
mod params;
mod query;
mod statement;

pub use connection::MssqlConnection;
pub use cursor::MssqlCursor;
pub use statement::MssqlStatement;
