//! Certificate parser bridge.
//!
//! Hands a PEM certificate to an external command (`zcertificate -format pem`
//! by default) on stdin and reads the JSON document it prints on stdout.
//! One process per certificate; the process never outlives the call.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};

use crate::error_handling::ParseError;
use crate::tls::PemCertificate;

/// Turns a PEM certificate into a structured JSON document.
#[async_trait]
pub trait CertificateParser: Send + Sync {
    async fn parse(&self, pem: &PemCertificate) -> Result<Value, ParseError>;
}

/// `CertificateParser` backed by an external process.
#[derive(Debug, Clone)]
pub struct ExternalParser {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ExternalParser {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }
}

#[async_trait]
impl CertificateParser for ExternalParser {
    async fn parse(&self, pem: &PemCertificate) -> Result<Value, ParseError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ParseError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let (status, stdout, stderr) =
            match tokio::time::timeout(self.timeout, communicate(&mut child, pem.as_bytes())).await
            {
                Ok(result) => result.map_err(|source| ParseError::Io {
                    command: self.command.clone(),
                    source,
                })?,
                Err(_) => {
                    // kill() also waits, so the child is reaped before we return
                    if let Err(e) = child.kill().await {
                        debug!("Failed to kill timed out {}: {e}", self.command);
                    }
                    return Err(ParseError::Timeout {
                        command: self.command.clone(),
                        secs: self.timeout.as_secs(),
                    });
                }
            };

        if !status.success() {
            return Err(ParseError::NonZeroExit {
                command: self.command.clone(),
                code: status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        decode_document(&self.command, &stdout)
    }
}

/// Writes `input` to the child's stdin, closes it, drains stdout and stderr
/// concurrently and waits for exit.
async fn communicate(
    child: &mut Child,
    input: &[u8],
) -> std::io::Result<(ExitStatus, Vec<u8>, Vec<u8>)> {
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let write = async move {
        if let Some(mut stdin) = stdin {
            match stdin.write_all(input).await {
                // The parser may exit without reading everything
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                other => other?,
            }
        }
        Ok::<(), std::io::Error>(())
    };
    let read_stdout = async move {
        let mut buf = Vec::new();
        if let Some(mut stdout) = stdout {
            stdout.read_to_end(&mut buf).await?;
        }
        Ok::<Vec<u8>, std::io::Error>(buf)
    };
    let read_stderr = async move {
        let mut buf = Vec::new();
        if let Some(mut stderr) = stderr {
            stderr.read_to_end(&mut buf).await?;
        }
        Ok::<Vec<u8>, std::io::Error>(buf)
    };

    let (written, stdout, stderr) = tokio::join!(write, read_stdout, read_stderr);
    written?;
    let status = child.wait().await?;
    Ok((status, stdout?, stderr?))
}

/// Decodes the first JSON value in `stdout`, which must be an object.
fn decode_document(command: &str, stdout: &[u8]) -> Result<Value, ParseError> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::EmptyOutput {
            command: command.to_string(),
        });
    }

    let document = serde_json::Deserializer::from_slice(stdout)
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| ParseError::EmptyOutput {
            command: command.to_string(),
        })?
        .map_err(|source| ParseError::InvalidJson {
            command: command.to_string(),
            source,
        })?;

    if !document.is_object() {
        return Err(ParseError::NotAnObject {
            command: command.to_string(),
        });
    }
    Ok(document)
}
