//! Read and Seek over the decrypted stream
//!
//! A plaintext position maps to a blob and an offset inside it with the
//! same arithmetic lbrynet-based players have always used: the blob number
//! divides by `max_blob_size - 2`, while the in-blob offset subtracts whole
//! `max_blob_size` strides and adds back one byte per preceding blob. The
//! two disagree for the last `blob_num` positions before each boundary;
//! those positions report [`StreamError::MisalignedOffset`].

use bytes::Bytes;

use super::StreamHandle;
use crate::error::{Result, StreamError};

/// Reference point for [`StreamHandle::seek`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl TryFrom<i32> for Whence {
    type Error = StreamError;

    /// Map the classic `SEEK_SET`/`SEEK_CUR`/`SEEK_END` codes
    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::Start),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            other => Err(StreamError::InvalidWhence(other)),
        }
    }
}

/// Blob number and in-blob offset for a plaintext position
pub fn blob_position(cursor: u64, max_blob_size: u64) -> Result<(u64, u64)> {
    let divisor = max_blob_size.saturating_sub(2).max(1);
    let blob_num = cursor / divisor;

    let mut offset = i128::from(cursor) - i128::from(blob_num) * i128::from(max_blob_size);
    if blob_num > 0 {
        offset += i128::from(blob_num);
    }

    u64::try_from(offset)
        .map(|offset| (blob_num, offset))
        .map_err(|_| StreamError::MisalignedOffset { cursor, blob_num })
}

impl StreamHandle {
    /// Read decrypted bytes at the cursor into `buf`
    ///
    /// Touches at most one blob, so a read that spans a blob boundary
    /// returns only the bytes left in the current blob. `Ok(0)` with a
    /// non-empty buffer means end of stream.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let cursor = self.cursor;
        let (blob_num, offset_in_blob) = blob_position(cursor, self.options.max_blob_size)?;
        let plaintext = self.blob_plaintext(blob_num).await?;

        let len = plaintext.len() as u64;
        let written = if offset_in_blob >= len {
            0
        } else {
            let end = len.min(offset_in_blob + buf.len() as u64);
            let chunk = &plaintext[offset_in_blob as usize..end as usize];
            buf[..chunk.len()].copy_from_slice(chunk);
            chunk.len()
        };

        self.cursor += written as u64;

        tracing::debug!(
            uri = %self.uri,
            read_buffer_length = buf.len(),
            blob_num,
            current_offset = cursor,
            offset_in_blob,
            bytes_written = written,
            "read from blob stream"
        );
        Ok(written)
    }

    /// Move the cursor and return the new position
    ///
    /// `End` counts back from the stream size. Positions past the end are
    /// accepted; the next read reports the problem.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => i128::from(self.cursor),
            Whence::End => i128::from(self.size),
        };
        let target = match whence {
            Whence::End => base - i128::from(offset),
            Whence::Start | Whence::Current => base + i128::from(offset),
        };

        if target < 0 {
            return Err(StreamError::NegativeSeek(target));
        }
        let position = u64::try_from(target).map_err(|_| StreamError::SeekOverflow(target))?;

        self.cursor = position;
        Ok(position)
    }

    /// Seek with a numeric whence (0 start, 1 current, 2 end)
    pub fn seek_raw(&mut self, offset: i64, whence: i32) -> Result<u64> {
        self.seek(offset, Whence::try_from(whence)?)
    }

    async fn blob_plaintext(&mut self, blob_num: u64) -> Result<Bytes> {
        if let Some((memo_num, plaintext)) = &self.memo
            && *memo_num == blob_num
        {
            return Ok(plaintext.clone());
        }

        let blob_count = self.descriptor.blob_count();
        let blob = usize::try_from(blob_num)
            .ok()
            .and_then(|index| self.descriptor.blob(index))
            .ok_or(StreamError::IndexOutOfRange {
                blob_num,
                blob_count,
            })?;

        let started = std::time::Instant::now();
        let plaintext = match self.decryptor.fetch(blob).await {
            Ok(plaintext) => plaintext,
            Err(e) => {
                tracing::warn!(uri = %self.uri, blob_num, error = %e, "blob retrieval failed");
                return Err(e);
            }
        };

        if blob_num == 0 && !self.first_blob_served {
            self.first_blob_served = true;
            let since_request = self.requested_at.elapsed();
            tracing::info!(
                uri = %self.uri,
                sd_hash = %self.sd_hash,
                first_blob_time = started.elapsed().as_secs_f64(),
                since_request_ms = since_request.as_millis() as u64,
                "stream playback requested"
            );
            if let Some(metrics) = &self.options.metrics {
                metrics.record_first_blob(since_request);
            }
        }

        if self.options.memoize_last_blob {
            self.memo = Some((blob_num, plaintext.clone()));
        }
        Ok(plaintext)
    }
}
