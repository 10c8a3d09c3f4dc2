use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

use crate::storage::{MismatchRecord, MismatchSink, SinkError};

/// Writes each record as one JSON line on standard output.
#[derive(Debug)]
pub struct StdoutSink {
    out: Mutex<Stdout>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            out: Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize `record` as a single newline-terminated JSON line.
pub fn encode_line(record: &MismatchRecord) -> Result<Vec<u8>, SinkError> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    Ok(line)
}

#[async_trait]
impl MismatchSink for StdoutSink {
    async fn store(&self, record: &MismatchRecord) -> Result<(), SinkError> {
        let line = encode_line(record)?;
        // one write_all under the lock keeps concurrent lines whole
        let mut out = self.out.lock().await;
        out.write_all(&line).await?;
        out.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record() -> MismatchRecord {
        MismatchRecord {
            url: "/a\nb".into(),
            headers: BTreeMap::new(),
            primary_status: 200,
            secondary_status: 200,
            primary_payload: Some("{\n}".into()),
            secondary_payload: None,
        }
    }

    #[test]
    fn encodes_one_line() {
        let record = record();
        let line = encode_line(&record).unwrap();
        assert_eq!(line.iter().filter(|b| **b == b'\n').count(), 1);
        assert_eq!(line.last(), Some(&b'\n'));

        let parsed: MismatchRecord = serde_json::from_slice(&line).unwrap();
        assert_eq!(parsed, record);
    }

    #[tokio::test]
    async fn concurrent_stores_succeed() {
        let sink = std::sync::Arc::new(StdoutSink::new());
        let record = record();
        let writes = (0..8).map(|_| {
            let sink = sink.clone();
            let record = record.clone();
            tokio::spawn(async move { sink.store(&record).await })
        });
        for write in futures_util::future::join_all(writes).await {
            write.unwrap().unwrap();
        }
    }
}
