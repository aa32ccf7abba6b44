//! Group-level download throttling
//!
//! A [`SpeedLimited`] stream reads through a token bucket whose capacity and
//! refill rate both equal the group cap in bytes per second. The bucket starts
//! full, so the first second's worth of bytes is served without waiting.

use depot_storage::BoxedContent;
use std::future::Future;
use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};
use tokio::time::{Instant, Sleep};

/// Smallest wait worth scheduling; avoids waking for a handful of bytes
const MIN_WAIT: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64, // tokens per second
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        let tokens_to_add = elapsed * self.refill_rate;

        self.tokens = (self.tokens + tokens_to_add).min(self.capacity);
        self.last_refill = now;
    }

    /// Take up to `want` whole tokens, returning how many were taken.
    pub fn take(&mut self, want: usize) -> usize {
        self.refill();

        let available = self.tokens.floor().max(0.0) as usize;
        let taken = available.min(want);
        self.tokens -= taken as f64;
        taken
    }

    /// Return tokens that were taken but not spent.
    pub fn refund(&mut self, tokens: usize) {
        self.tokens = (self.tokens + tokens as f64).min(self.capacity);
    }

    /// Time until `want` tokens (capped at capacity) are available.
    pub fn time_until(&self, want: usize) -> Duration {
        let want = (want as f64).min(self.capacity);
        if self.tokens >= want {
            Duration::from_secs(0)
        } else {
            let tokens_needed = want - self.tokens;
            let seconds = tokens_needed / self.refill_rate;
            Duration::from_secs_f64(seconds.max(0.0))
        }
    }
}

/// A readable, seekable stream throttled to `bytes_per_sec`.
///
/// Seeks go straight to the inner stream. Dropping the wrapper drops, and so
/// closes, the inner stream.
pub struct SpeedLimited<S> {
    inner: S,
    bucket: TokenBucket,
    /// Bytes read per wait cycle once the burst is spent
    chunk: usize,
    scratch: Vec<u8>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl<S> SpeedLimited<S> {
    pub fn new(inner: S, bytes_per_sec: u64) -> Self {
        let rate = bytes_per_sec.max(1) as f64;
        let chunk = ((bytes_per_sec / 16).max(1) as usize).min(64 * 1024);
        Self {
            inner,
            bucket: TokenBucket::new(rate, rate),
            chunk,
            scratch: Vec::new(),
            sleep: None,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

/// Wrap `stream` for a group cap of `bytes_per_sec`; 0 means unlimited and
/// returns the stream untouched.
pub fn limit(stream: BoxedContent, bytes_per_sec: u64) -> BoxedContent {
    if bytes_per_sec == 0 {
        return stream;
    }
    Box::new(SpeedLimited::new(stream, bytes_per_sec))
}

impl<S: AsyncRead + Unpin> AsyncRead for SpeedLimited<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        loop {
            if let Some(sleep) = this.sleep.as_mut() {
                ready!(sleep.as_mut().poll(cx));
                this.sleep = None;
            }

            let want = buf.remaining();
            if want == 0 {
                return Poll::Ready(Ok(()));
            }

            let allowed = this.bucket.take(want);
            if allowed == 0 {
                let wait = this.bucket.time_until(want.min(this.chunk)).max(MIN_WAIT);
                this.sleep = Some(Box::pin(tokio::time::sleep(wait)));
                continue;
            }

            if this.scratch.len() < allowed {
                this.scratch.resize(allowed, 0);
            }
            let mut limited = ReadBuf::new(&mut this.scratch[..allowed]);

            match Pin::new(&mut this.inner).poll_read(cx, &mut limited) {
                Poll::Ready(Ok(())) => {
                    let n = limited.filled().len();
                    buf.put_slice(limited.filled());
                    this.bucket.refund(allowed - n);
                    return Poll::Ready(Ok(()));
                }
                Poll::Ready(Err(e)) => {
                    this.bucket.refund(allowed);
                    return Poll::Ready(Err(e));
                }
                Poll::Pending => {
                    this.bucket.refund(allowed);
                    return Poll::Pending;
                }
            }
        }
    }
}

impl<S: AsyncSeek + Unpin> AsyncSeek for SpeedLimited<S> {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        Pin::new(&mut self.get_mut().inner).start_seek(position)
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Pin::new(&mut self.get_mut().inner).poll_complete(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::{AsyncReadExt, AsyncSeekExt};

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn bucket_refills_over_time() {
        let mut bucket = TokenBucket::new(100.0, 100.0);
        assert_eq!(bucket.take(150), 100);
        assert_eq!(bucket.take(1), 0);
        assert_eq!(bucket.time_until(50), Duration::from_millis(500));

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(bucket.take(100), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn throughput_stays_within_cap_plus_burst() {
        let cap = 1024u64;
        let data = payload(5 * 1024);
        let mut limited = SpeedLimited::new(Cursor::new(data.clone()), cap);

        let start = Instant::now();
        let mut out = Vec::new();
        limited.read_to_end(&mut out).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(out, data);
        // 1 KiB burst, then 4 KiB at 1 KiB/s
        assert!(elapsed >= Duration::from_secs(4), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(5), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_is_served_without_waiting() {
        let mut limited = SpeedLimited::new(Cursor::new(payload(4096)), 2048);

        let start = Instant::now();
        let mut first = vec![0u8; 2048];
        limited.read_exact(&mut first).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(0));
    }

    #[tokio::test(start_paused = true)]
    async fn seeks_pass_through() {
        let data = payload(64);
        let mut limited = SpeedLimited::new(Cursor::new(data.clone()), 16);

        limited.seek(SeekFrom::Start(60)).await.unwrap();
        let mut out = Vec::new();
        limited.read_to_end(&mut out).await.unwrap();

        assert_eq!(out, data[60..].to_vec());
    }

    #[tokio::test]
    async fn zero_cap_is_pass_through() {
        let data = payload(10 * 1024 * 1024);
        let mut stream = limit(Box::new(Cursor::new(data.clone())), 0);

        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, data);
    }
}
