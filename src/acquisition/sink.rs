//! Destinations for samples leaving the consumer thread.

use std::sync::mpsc;

use crate::sample::Sample;

/// Receives every sample the consumer thread pops, in queue order.
pub trait SampleSink: Send + 'static {
    /// Consumes one sample. Called on the consumer thread only.
    fn deliver(&mut self, sample: Sample);
}

impl<F> SampleSink for F
where
    F: FnMut(Sample) + Send + 'static,
{
    fn deliver(&mut self, sample: Sample) {
        self(sample)
    }
}

/// Forwards samples over a channel; samples are discarded once the receiver is gone.
impl SampleSink for mpsc::Sender<Sample> {
    fn deliver(&mut self, sample: Sample) {
        if self.send(sample).is_err() {
            trace!("sample receiver dropped, discarding");
        }
    }
}

/// Writes each sample to the log at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl SampleSink for LogSink {
    fn deliver(&mut self, sample: Sample) {
        info!("X = {} ; Y = {} ; Z = {}", sample.x, sample.y, sample.z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_and_channels_are_sinks() {
        let (tx, rx) = mpsc::channel();
        let mut channel_sink = tx;
        channel_sink.deliver(Sample::new(1, 2, 3));
        assert_eq!(rx.try_recv(), Ok(Sample::new(1, 2, 3)));

        let mut seen = Vec::new();
        let (count_tx, count_rx) = mpsc::channel();
        let mut closure_sink = move |s: Sample| count_tx.send(s.x).unwrap();
        closure_sink.deliver(Sample::new(7, 0, 0));
        seen.extend(count_rx.try_iter());
        assert_eq!(seen, [7]);
    }

    #[test]
    fn channel_sink_tolerates_dropped_receiver() {
        let (tx, rx) = mpsc::channel::<Sample>();
        drop(rx);
        let mut sink = tx;
        sink.deliver(Sample::default());
    }
}
