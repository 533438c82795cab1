use tiberius::{Client, Config, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::info;

use crate::error::SqlSessionError;

/// Type alias for SQL Server client
pub type MssqlClient = Client<Compat<TcpStream>>;

/// Connect using an ADO.NET-style connection string
/// (`Server=tcp:host,1433;Database=...;User Id=...;Password=...`).
///
/// Named instances (`Server=host\INSTANCE`) are resolved through the SQL Browser service,
/// and an Azure gateway redirect is followed once.
///
/// # Errors
///
/// Returns `SqlSessionError::MssqlError` if the connection string is invalid or the
/// login fails, `SqlSessionError::IoError` if the TCP connection cannot be made.
pub async fn create_mssql_client(connection_string: &str) -> Result<MssqlClient, SqlSessionError> {
    let config = Config::from_ado_string(connection_string)?;

    let tcp = TcpStream::connect_named(&config).await?;
    tcp.set_nodelay(true)?;

    match Client::connect(config.clone(), tcp.compat_write()).await {
        Ok(client) => Ok(client),
        Err(tiberius::error::Error::Routing { host, port }) => {
            info!(%host, port, "following SQL Server routing redirect");
            let mut config = config;
            config.host(&host);
            config.port(port);

            let tcp = TcpStream::connect(config.get_addr()).await?;
            tcp.set_nodelay(true)?;
            Ok(Client::connect(config, tcp.compat_write()).await?)
        }
        Err(err) => Err(err.into()),
    }
}
