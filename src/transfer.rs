//! 上传/下载的流式搬运：固定大小缓冲，不把整个文件读入内存。

use futures_util::stream::{Stream, StreamExt};
use std::fmt::Display;
use std::path::Path;
use std::pin::pin;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, Take};
use tokio_util::io::ReaderStream;

use crate::atomic::AtomicFile;
use crate::config::TRANSFER_BUFFER_SIZE;
use crate::storage::StoreError;

pub type ByteStream = ReaderStream<Take<File>>;

/// 把来源流写入 `dir` 下的新临时文件，返回临时文件与实际字节数。
///
/// 来源报错、提前结束或超出声明大小都视为 `TransferInterrupted`；
/// 写盘失败为 `WriteFailed`。出错时临时文件随 `AtomicFile` 一起被清理。
pub async fn copy_in<S, B, E>(
    source: S,
    declared_size: Option<u64>,
    dir: &Path,
) -> Result<(AtomicFile, u64), StoreError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut temp = AtomicFile::create_in(dir)
        .await
        .map_err(StoreError::WriteFailed)?;
    let mut source = pin!(source);
    let mut written: u64 = 0;

    while let Some(chunk) = source.next().await {
        let chunk = chunk.map_err(|err| StoreError::TransferInterrupted(err.to_string()))?;
        let bytes = chunk.as_ref();
        if bytes.is_empty() {
            continue;
        }
        written += bytes.len() as u64;
        if let Some(expected) = declared_size
            && written > expected
        {
            return Err(StoreError::TransferInterrupted(format!(
                "received more than the declared {expected} bytes"
            )));
        }
        temp.file_mut()
            .write_all(bytes)
            .await
            .map_err(StoreError::WriteFailed)?;
    }

    if let Some(expected) = declared_size
        && written != expected
    {
        return Err(StoreError::TransferInterrupted(format!(
            "source ended after {written} of {expected} bytes"
        )));
    }

    Ok((temp, written))
}

/// 以有界缓冲输出文件内容，最多 `size` 字节。
pub fn copy_out(file: File, size: u64) -> ByteStream {
    ReaderStream::with_capacity(file.take(size), TRANSFER_BUFFER_SIZE)
}
