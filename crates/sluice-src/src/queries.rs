//! Default answers to queries asked of a source.

use sluice_platform::ClockTime;
use tracing::{debug, trace};

use crate::{
    element::SourceElement,
    format::{Format, PERCENT_MAX},
    query::Query,
};

impl SourceElement {
    /// Answer `query` through [`SourceImpl::query`](crate::SourceImpl::query).
    pub fn query(&self, query: &mut Query) -> bool {
        let answered = self.inner.imp.query(self, query);
        trace!(name = %self.inner.name, query = query.name(), answered, "query");
        answered
    }

    /// Latency as reported by the default latency query: `(live, min, max)`.
    #[must_use]
    pub fn query_latency(&self) -> (bool, ClockTime, Option<ClockTime>) {
        (self.is_live(), 0, Some(0))
    }

    /// Default [`SourceImpl::query`](crate::SourceImpl::query).
    pub fn default_query(&self, query: &mut Query) -> bool {
        match query {
            Query::Position { format, position } => {
                let segment = self.segment();
                match *format {
                    Format::Percent => {
                        *position = segment.duration.map(|duration| {
                            if segment.position < duration {
                                scale(PERCENT_MAX, segment.position, duration)
                            } else {
                                PERCENT_MAX
                            }
                        });
                        true
                    }
                    f if f == segment.format => {
                        *position = if f == Format::Time {
                            segment.to_stream_time(segment.position)
                        } else {
                            Some(segment.position)
                        };
                        true
                    }
                    f => {
                        debug!(name = %self.inner.name, format = %f, "cannot convert position");
                        false
                    }
                }
            }
            Query::Duration { format, duration } => {
                if *format == Format::Percent {
                    *duration = Some(PERCENT_MAX);
                    return true;
                }
                self.refresh_size();
                let segment = self.segment();
                match segment.duration {
                    None => {
                        *duration = None;
                        true
                    }
                    Some(d) if *format == segment.format => {
                        *duration = Some(d);
                        true
                    }
                    Some(_) => false,
                }
            }
            Query::Segment {
                format,
                rate,
                start,
                stop,
            } => {
                let segment = self.segment();
                *format = segment.format;
                *rate = segment.rate;
                *start = segment.to_stream_time(segment.start);
                *stop = segment
                    .stop
                    .or(segment.duration)
                    .and_then(|stop| segment.to_stream_time(stop));
                true
            }
            Query::Seeking {
                format,
                seekable,
                start,
                end,
            } => {
                let (segment_format, duration, is_seekable) = {
                    let obj = self.inner.object.lock();
                    (obj.segment.format, obj.segment.duration, obj.seekable)
                };
                if *format != segment_format {
                    return false;
                }
                *seekable = is_seekable;
                *start = Some(0);
                *end = duration;
                true
            }
            Query::Formats(formats) => {
                *formats = vec![Format::Default, Format::Bytes, Format::Percent];
                true
            }
            Query::Convert {
                src_format,
                src_value,
                dest_format,
                dest_value,
            } => {
                if src_format != dest_format {
                    return false;
                }
                *dest_value = Some(*src_value);
                true
            }
            Query::Latency { live, min, max } => {
                (*live, *min, *max) = self.query_latency();
                true
            }
            Query::Jitter | Query::Rate => false,
            Query::Buffering {
                format,
                percent,
                start,
                stop,
                estimated_total,
            } => {
                let obj = self.inner.object.lock();
                if obj.random_access {
                    *percent = 100;
                    *start = Some(0);
                    *estimated_total = Some(0);
                    *stop = if *format == Format::Percent {
                        Some(PERCENT_MAX)
                    } else if *format == obj.segment.format {
                        obj.segment.duration
                    } else {
                        return false;
                    };
                } else {
                    *percent = 100;
                    *start = None;
                    *stop = None;
                    *estimated_total = None;
                }
                true
            }
            Query::Caps { filter, result } => {
                *result = self.inner.imp.get_caps(self, filter.as_ref());
                result.is_some()
            }
            Query::Uri(uri) => {
                *uri = self.inner.imp.uri();
                uri.is_some()
            }
            Query::Allocation(_) => false,
        }
    }

    /// Re-read the size of a dynamic byte stream into the segment duration.
    pub(crate) fn refresh_size(&self) {
        let (format, dynamic) = {
            let obj = self.inner.object.lock();
            (obj.segment.format, obj.dynamic_size)
        };
        if format != Format::Bytes || !dynamic {
            return;
        }
        if let Some(size) = self.inner.imp.get_size(self) {
            trace!(name = %self.inner.name, size, "refreshed size");
            self.inner.object.lock().segment.duration = Some(size);
        }
    }
}

fn scale(value: u64, num: u64, denom: u64) -> u64 {
    let scaled = u128::from(value) * u128::from(num) / u128::from(denom);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}
