// MySQL module - blocking MySQL / MariaDB sessions on top of mysql_async
//
// - config: connection options
// - value: conversion between server values and RowValues
// - connection: the Connection implementation
// - cursor: streaming and buffered cursors
// - statement: server-side prepared statements

mod config;
mod connection;
mod cursor;
mod statement;
mod value;

pub use connection::MysqlConnection;
pub use cursor::MysqlCursor;
pub use statement::MysqlStatement;
