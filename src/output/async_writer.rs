use std::path::PathBuf;

use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::ReconError;

/// Resolves to the number of records written.
pub type WriterHandle = JoinHandle<Result<usize, ReconError>>;

/// Spawn the single writer of a text log. Each received string becomes one line.
/// Workers only ever send, so lines from concurrent items never interleave.
pub fn spawn_line_writer(path: PathBuf, mut rx: mpsc::Receiver<String>) -> WriterHandle {
    tokio::spawn(async move {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| ReconError::fatal(&path, e))?;
        let mut written = 0usize;
        while let Some(mut line) = rx.recv().await {
            line.push('\n');
            f.write_all(line.as_bytes()).await.map_err(|e| ReconError::fatal(&path, e))?;
            written += 1;
        }
        // flush on close
        f.flush().await.map_err(|e| ReconError::fatal(&path, e))?;
        Ok(written)
    })
}

/// Spawn the single writer of a JSONL log.
pub fn spawn_jsonl_writer<T>(path: PathBuf, mut rx: mpsc::Receiver<T>) -> WriterHandle
where
    T: Serialize + Send + 'static,
{
    tokio::spawn(async move {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| ReconError::fatal(&path, e))?;
        let mut written = 0usize;
        while let Some(ev) = rx.recv().await {
            match serde_json::to_vec(&ev) {
                Ok(mut v) => {
                    v.push(b'\n');
                    f.write_all(&v).await.map_err(|e| ReconError::fatal(&path, e))?;
                    written += 1;
                }
                Err(e) => {
                    tracing::error!(error=%e, "failed to serialize record");
                }
            }
        }
        f.flush().await.map_err(|e| ReconError::fatal(&path, e))?;
        Ok(written)
    })
}

/// Wait for a writer after all its senders were dropped.
pub async fn finish(handle: WriterHandle, path: PathBuf) -> Result<usize, ReconError> {
    match handle.await {
        Ok(res) => res,
        Err(e) => Err(ReconError::fatal(path, std::io::Error::other(e.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Rec {
        url: &'static str,
        status: u16,
    }

    #[tokio::test]
    async fn concurrent_senders_produce_whole_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("endpoints.txt");
        let (tx, rx) = mpsc::channel::<String>(8);
        let handle = spawn_line_writer(path.clone(), rx);

        let mut tasks = Vec::new();
        for i in 0..20 {
            let tx = tx.clone();
            tasks.push(tokio::spawn(async move {
                tx.send(format!("200 http://h{}.example.org/snapshot.jpg", i)).await.unwrap();
            }));
        }
        drop(tx);
        for t in tasks {
            t.await.unwrap();
        }
        assert_eq!(finish(handle, path.clone()).await.unwrap(), 20);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 20);
        assert!(text.lines().all(|l| l.starts_with("200 http://h") && l.ends_with("/snapshot.jpg")));
    }

    #[tokio::test]
    async fn jsonl_writer_emits_one_object_per_line() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("endpoints.jsonl");
        let (tx, rx) = mpsc::channel(4);
        let handle = spawn_jsonl_writer(path.clone(), rx);
        tx.send(Rec { url: "http://a/", status: 200 }).await.unwrap();
        tx.send(Rec { url: "http://b/", status: 0 }).await.unwrap();
        drop(tx);
        assert_eq!(finish(handle, path.clone()).await.unwrap(), 2);
        let text = std::fs::read_to_string(&path).unwrap();
        let first: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(first["status"], 200);
    }

    #[tokio::test]
    async fn unopenable_path_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing-dir").join("log.txt");
        let (tx, rx) = mpsc::channel::<String>(1);
        let handle = spawn_line_writer(path.clone(), rx);
        drop(tx);
        assert!(finish(handle, path).await.unwrap_err().is_fatal());
    }
}
