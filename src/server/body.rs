//! Reading a request body into a caller-provided buffer.

use bytes::{Buf, BufMut};
use http_body_util::BodyExt;
use hyper::body::Body;

use crate::error::{BoxError, Error, Result};

/// Drain `body` to end-of-stream into `buf`, returning the number of bytes read.
///
/// The buffer may already hold data; the body is rejected with
/// [`Error::BodyTooLarge`] as soon as the total would pass `limit`, so a
/// buffer pre-sized to `limit` never reallocates. Trailers are ignored.
pub async fn drain_body<B, T>(body: B, buf: &mut T, limit: usize) -> Result<usize>
where
    B: Body,
    B::Error: Into<BoxError>,
    T: BufMut + AsRef<[u8]>,
{
    let mut body = std::pin::pin!(body);
    let mut read = 0;

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| Error::Body(e.into()))?;
        let Ok(data) = frame.into_data() else {
            continue;
        };

        let chunk = data.remaining();
        if buf.as_ref().len() + chunk > limit {
            return Err(Error::BodyTooLarge { limit });
        }

        buf.put(data);
        read += chunk;
    }

    Ok(read)
}
