use std::io::{self, Write};
use std::path::Path;

use env_logger::Builder;
use tokio::{
    fs::{create_dir_all, metadata, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
};
use tokio_util::sync::CancellationToken;

use crate::config;
use crate::core::ProKitResult;

pub struct AsyncWriter {
    sender: UnboundedSender<Vec<u8>>,
}

impl Write for AsyncWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let data = buf.to_vec();
        self.sender.send(data).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Routes `env_logger` output to a file through a background task
pub struct Logger {
    sender: UnboundedSender<Vec<u8>>,
    receiver: UnboundedReceiver<Vec<u8>>,
    config: config::Log,
}

impl Logger {
    pub fn new(config: config::Log) -> Self {
        let (sender, receiver) = unbounded_channel::<Vec<u8>>();
        Self {
            sender,
            receiver,
            config,
        }
    }

    pub fn create_async_writer(&self) -> AsyncWriter {
        AsyncWriter {
            sender: self.sender.clone(),
        }
    }

    /// Installs the global logger, writing into this logger's channel.
    pub fn init_env_logger(&self) {
        let writer = self.create_async_writer();
        let result = Builder::from_env(env_logger::Env::default())
            .filter(None, self.config.level_filter())
            .target(env_logger::Target::Pipe(Box::new(writer)))
            .try_init();
        if let Err(e) = result {
            eprintln!("Logger already initialized: {e}");
        }
    }

    /// Drains the channel into the log file until `shutdown` fires or every
    /// writer is gone.
    pub async fn run(self, shutdown: CancellationToken) -> ProKitResult<()> {
        let Logger {
            sender,
            mut receiver,
            config,
        } = self;
        // Only external writers keep the channel open.
        drop(sender);

        let log_file_path = Path::new(&config.path);
        if let Some(parent) = log_file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if metadata(parent).await.is_err() {
                create_dir_all(parent).await?;
            }
        }

        let mut file = BufWriter::new(
            OpenOptions::new()
                .append(true)
                .create(true)
                .open(log_file_path)
                .await?,
        );

        loop {
            tokio::select! {
                biased;
                // Shutdown signal handling
                _ = shutdown.cancelled() => {
                    log::info!("Shutdown signal received, stopping write log");
                    // pick up what was logged before the signal
                    while let Ok(data) = receiver.try_recv() {
                        file.write_all(&data).await?;
                    }
                    break;
                },

                data = receiver.recv() => {
                    match data {
                        Some(data) => {
                            if let Err(e) = file.write_all(&data).await {
                                eprintln!("Failed to write to log file: {e}");
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logger_writes_until_writers_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("prokit.log");
        let logger = Logger::new(config::Log {
            path: path.to_string_lossy().into_owned(),
            level: "debug".to_string(),
        });

        let mut writer = logger.create_async_writer();
        let task = tokio::spawn(logger.run(CancellationToken::new()));

        writer.write_all(b"first line\n").unwrap();
        writer.write_all(b"second line\n").unwrap();
        drop(writer);

        task.await.unwrap().unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first line\nsecond line\n");
    }

    #[tokio::test]
    async fn test_logger_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prokit.log");
        let logger = Logger::new(config::Log {
            path: path.to_string_lossy().into_owned(),
            level: "info".to_string(),
        });

        let mut writer = logger.create_async_writer();
        writer.write_all(b"before shutdown\n").unwrap();

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        logger.run(shutdown).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "before shutdown\n");
        // the writer outlives the task; sends now fail instead of blocking
        assert!(writer.write_all(b"late\n").is_err());
    }
}
