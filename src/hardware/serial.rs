// src/hardware/serial.rs - Host link over serial or stdio
//
// The controller treats the host purely as line-in/line-out channels; the
// transport lives in background tasks bridged over mpsc, one line per message.
use std::sync::Arc;

use serial2_tokio::SerialPort;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::hardware::HardwareError;

/// Inbound command lines and outbound emission lines.
pub type LinkChannels = (
    mpsc::UnboundedReceiver<String>,
    mpsc::UnboundedSender<String>,
);

/// Longest unterminated run of bytes kept while waiting for a newline. No
/// valid command comes close; anything longer is a misbehaving peer.
const MAX_LINE_BYTES: usize = 512;

/// Drain every complete line out of the accumulator, trimmed, empty lines
/// skipped. Leftover unterminated bytes beyond the cap are discarded.
fn split_lines(acc: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = acc.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = acc.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&raw).trim().to_string();
        if !line.is_empty() {
            lines.push(line);
        }
    }
    if acc.len() > MAX_LINE_BYTES {
        tracing::warn!(
            "discarding {} unterminated bytes from host link",
            acc.len()
        );
        acc.clear();
    }
    lines
}

/// Open the serial host link and spawn its reader/writer tasks.
pub fn open_serial_link(port_name: &str, baud: u32) -> Result<LinkChannels, HardwareError> {
    let port = SerialPort::open(port_name, baud)
        .map_err(|e| HardwareError::Link(format!("failed to open {port_name}: {e}")))?;
    let port = Arc::new(port);

    let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    let read_port = port.clone();
    tokio::spawn(async move {
        let mut acc: Vec<u8> = Vec::new();
        let mut buf = [0u8; 256];
        loop {
            match read_port.read(&mut buf).await {
                Ok(0) => {
                    tracing::info!("serial link closed by remote");
                    break;
                }
                Ok(n) => {
                    acc.extend_from_slice(&buf[..n]);
                    for line in split_lines(&mut acc) {
                        tracing::debug!("host RX: {}", line);
                        if in_tx.send(line).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("serial read error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::spawn(async move {
        while let Some(line) = out_rx.recv().await {
            tracing::debug!("host TX: {}", line);
            let framed = format!("{line}\n");
            let mut data = framed.as_bytes();
            while !data.is_empty() {
                match port.write(data).await {
                    Ok(n) => data = &data[n..],
                    Err(e) => {
                        tracing::error!("serial write error: {}", e);
                        return;
                    }
                }
            }
        }
        tracing::info!("serial writer task terminated");
    });

    Ok((in_rx, out_tx))
}

/// Stdin/stdout host link for local bring-up.
pub fn open_stdio_link() -> LinkChannels {
    let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            if in_tx.send(line).is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = out_rx.recv().await {
            let framed = format!("{line}\n");
            if stdout.write_all(framed.as_bytes()).await.is_err() {
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    (in_rx, out_tx)
}
