//! One HTTP GET against one URL, body streamed into the destination file.

use std::time::Duration;

use crate::checksum::StreamHasher;
use crate::retry::AttemptError;
use crate::storage::DestinationFile;

use super::TransferOptions;

/// GET `url` and stream the body into `file`, feeding `hasher` as bytes arrive.
/// The caller owns cleanup: on `Err` the file holds garbage and must be discarded.
pub(super) fn fetch_once(
    url: &str,
    file: &mut DestinationFile,
    hasher: &mut Option<StreamHasher>,
    opts: &TransferOptions,
) -> Result<(), AttemptError> {
    let parsed = url::Url::parse(url).map_err(|_| AttemptError::InvalidUrl(url.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(AttemptError::InvalidUrl(url.to_string()));
    }

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(AttemptError::Curl)?;
    easy.follow_location(true).map_err(AttemptError::Curl)?;
    easy.max_redirections(10).map_err(AttemptError::Curl)?;
    easy.useragent(&opts.user_agent).map_err(AttemptError::Curl)?;
    easy.connect_timeout(opts.connect_timeout).map_err(AttemptError::Curl)?;
    // Abort stalled transfers: below `low_speed_limit` B/s for `low_speed_time`.
    easy.low_speed_limit(opts.low_speed_limit).map_err(AttemptError::Curl)?;
    easy.low_speed_time(opts.low_speed_time).map_err(AttemptError::Curl)?;
    if opts.request_timeout > Duration::ZERO {
        easy.timeout(opts.request_timeout).map_err(AttemptError::Curl)?;
    }

    let mut write_error: Option<std::io::Error> = None;
    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| match file.write_chunk(data) {
                Ok(()) => {
                    if let Some(h) = hasher.as_mut() {
                        h.update(data);
                    }
                    Ok(data.len())
                }
                Err(e) => {
                    write_error = Some(e);
                    Ok(0) // abort transfer
                }
            })
            .map_err(AttemptError::Curl)?;
        if let Err(e) = transfer.perform() {
            drop(transfer);
            if e.is_write_error() {
                if let Some(io_err) = write_error.take() {
                    return Err(AttemptError::Storage(io_err));
                }
            }
            return Err(AttemptError::Curl(e));
        }
    }

    let code = easy.response_code().map_err(AttemptError::Curl)?;
    if !(200..300).contains(&code) {
        return Err(AttemptError::Http(code));
    }
    Ok(())
}
