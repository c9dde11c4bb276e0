//! Database seam used by the loader, plus the MySQL connection behind it.

use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use mysql::{Conn, LocalInfileHandler, OptsBuilder, prelude::Queryable};

use crate::{config::DatabaseConfig, failure::DbError, schema::quote_identifier};

/// The operations the loader needs from a relational database.
///
/// Calls block; the loader owns the handle exclusively for a whole run.
pub trait Database {
    fn execute(&mut self, sql: &str) -> Result<(), DbError>;

    fn commit(&mut self) -> Result<(), DbError>;

    /// Declared maximum character length of a column, `None` for non-text types.
    fn column_max_length(&mut self, table: &str, column: &str) -> Result<Option<u64>, DbError>;

    fn row_count(&mut self, table: &str) -> Result<u64, DbError>;
}

impl From<mysql::Error> for DbError {
    fn from(err: mysql::Error) -> Self {
        match err {
            mysql::Error::MySqlError(server) => DbError::new(server.code, server.message),
            other => DbError::other(other.to_string()),
        }
    }
}

/// Resolves a file the server asked for during `LOAD DATA LOCAL INFILE`.
///
/// Only regular files under `root` (already canonical) are sent; any other
/// request is refused with `PermissionDenied`.
pub fn local_infile_path(root: &Path, requested: &[u8]) -> io::Result<PathBuf> {
    let requested = PathBuf::from(String::from_utf8_lossy(requested).into_owned());
    let resolved = requested.canonicalize()?;
    if resolved.starts_with(root) && resolved.is_file() {
        Ok(resolved)
    } else {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("refusing to send {requested:?}: not a file under {root:?}"),
        ))
    }
}

/// A single MySQL connection, released when dropped.
pub struct MySqlDatabase {
    conn: Conn,
    schema: String,
}

impl MySqlDatabase {
    /// Connects, creates `schema` if missing, selects it and enables strict mode.
    ///
    /// With `infile_root` set, client-side `LOAD DATA LOCAL INFILE` is enabled
    /// for files under that directory only.
    pub fn connect(
        config: &DatabaseConfig,
        schema: &str,
        infile_root: Option<&Path>,
    ) -> Result<Self, DbError> {
        info!(
            "Connecting to MySQL at {}:{} as '{}'",
            config.host, config.port, config.user
        );
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(config.host.clone()))
            .tcp_port(config.port)
            .user(Some(config.user.clone()))
            .pass(config.password.clone());
        let mut conn = Conn::new(opts)?;
        if let Some(root) = infile_root {
            let root = root.canonicalize().map_err(|err| {
                DbError::other(format!("resolving local infile directory {root:?}: {err}"))
            })?;
            debug!("Local infile enabled for files under {root:?}");
            conn.set_local_infile_handler(Some(LocalInfileHandler::new(
                move |file_name, writer| {
                    let path = local_infile_path(&root, file_name).inspect_err(|err| {
                        warn!("Local infile request rejected: {err}");
                    })?;
                    let mut file = File::open(&path)?;
                    io::copy(&mut file, writer)?;
                    Ok(())
                },
            )));
        }
        conn.query_drop(format!(
            "CREATE DATABASE IF NOT EXISTS {} DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci",
            quote_identifier(schema)
        ))?;
        conn.query_drop(format!("USE {}", quote_identifier(schema)))?;
        conn.query_drop("SET SESSION sql_mode = 'STRICT_ALL_TABLES'")?;
        debug!("Using schema '{schema}' in strict mode");
        Ok(Self {
            conn,
            schema: schema.to_string(),
        })
    }
}

impl Database for MySqlDatabase {
    fn execute(&mut self, sql: &str) -> Result<(), DbError> {
        debug!("SQL: {sql}");
        self.conn.query_drop(sql)?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DbError> {
        self.conn.query_drop("COMMIT")?;
        Ok(())
    }

    fn column_max_length(&mut self, table: &str, column: &str) -> Result<Option<u64>, DbError> {
        let length: Option<Option<u64>> = self.conn.exec_first(
            "SELECT CHARACTER_MAXIMUM_LENGTH FROM information_schema.COLUMNS \
             WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND COLUMN_NAME = ?",
            (self.schema.as_str(), table, column),
        )?;
        Ok(length.flatten())
    }

    fn row_count(&mut self, table: &str) -> Result<u64, DbError> {
        let count: Option<u64> = self
            .conn
            .query_first(format!("SELECT COUNT(*) FROM {}", quote_identifier(table)))?;
        Ok(count.unwrap_or(0))
    }
}
