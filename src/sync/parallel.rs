use super::Result;
use crate::p2p::Connection;

use futures::Future;

use std::sync::Arc;

/// Runs `write` on a spawned task and `read` on the current one.
///
/// Whichever side fails first disconnects the connection, which makes the other side's pending
/// operation fail as well. The read error wins when both fail.
pub async fn read_write_parallel<R, W, RO, WO>(
    connection: &Arc<Connection>,
    read: R,
    write: W,
) -> Result<(RO, WO)>
where
    R: Future<Output = Result<RO>>,
    W: Future<Output = Result<WO>> + Send + 'static,
    WO: Send + 'static,
{
    let writer = {
        let connection = connection.clone();
        tokio::spawn(async move {
            let result = write.await;
            if result.is_err() {
                connection.disconnect();
            }
            result
        })
    };

    let read_result = read.await;
    if read_result.is_err() {
        connection.disconnect();
    }
    let write_result = match writer.await {
        Ok(result) => result,
        Err(err) => {
            connection.disconnect();
            Err(err.into())
        }
    };
    Ok((read_result?, write_result?))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::channel;
    use crate::sync::Error;
    use crate::NodeId;
    use tokio::time::Duration;

    /// Fills the in-memory stream until the write blocks.
    async fn flood(connection: Arc<Connection>) -> Result<()> {
        loop {
            connection.write_booleans(vec![true; 4096]).await?;
            connection.flush().await?;
        }
    }

    #[actix_rt::test]
    async fn test_both_sides_complete() {
        let (a, b) = Connection::pair(NodeId(1), NodeId(2), Duration::from_secs(1));
        let (a, b) = (Arc::new(a), Arc::new(b));

        let write = {
            let a = a.clone();
            async move {
                a.write_byte(1).await?;
                a.flush().await?;
                Ok::<(), Error>(())
            }
        };
        let read = async { Ok::<u8, Error>(b.read_byte().await?) };
        let (read, ()) = read_write_parallel(&a, read, write).await.unwrap();
        assert_eq!(read, 1);
        assert!(a.is_connected());
    }

    #[actix_rt::test]
    async fn test_write_failure_unblocks_read() {
        let (a, _b) = Connection::pair(NodeId(1), NodeId(2), Duration::from_secs(30));
        let a = Arc::new(a);

        let write = async { Err::<(), Error>(Error::Protocol("write failed".to_string())) };
        let read = {
            let a = a.clone();
            async move { Ok::<u8, Error>(a.read_byte().await?) }
        };
        let result = read_write_parallel(&a, read, write).await;
        // The read was cut off by the disconnect and its error takes precedence.
        assert!(matches!(result, Err(Error::Channel(channel::Error::Disconnected))));
        assert!(!a.is_connected());
    }

    #[actix_rt::test]
    async fn test_read_failure_unblocks_write() {
        let (a, _b) = Connection::pair(NodeId(1), NodeId(2), Duration::from_secs(30));
        let a = Arc::new(a);

        let read = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err::<(), Error>(Error::Protocol("bad byte".to_string()))
        };
        let result = read_write_parallel(&a, read, flood(a.clone())).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }
}
