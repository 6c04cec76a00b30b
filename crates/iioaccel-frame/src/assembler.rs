use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use crate::error::{FrameError, Result};
use crate::scan::ScanDescriptor;

/// One complete scan frame, exactly `frame_size` bytes long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    bytes: Bytes,
}

impl RawFrame {
    /// Wrap bytes that are known to form one frame of `frame_size` bytes.
    pub fn new(bytes: impl Into<Bytes>, frame_size: usize) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() != frame_size {
            return Err(FrameError::FrameLength {
                expected: frame_size,
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes })
    }

    /// Frame contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Frame length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false for frames built by the assembler.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consume the frame and return its bytes.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

impl AsRef<[u8]> for RawFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Running counters kept by a [`FrameAssembler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    /// Frames completed.
    pub frames: u64,
    /// Completed frames dropped because a newer one arrived in the same
    /// notification.
    pub superseded: u64,
    /// Bytes read from the stream.
    pub bytes: u64,
}

/// Reassembles fixed-size scan frames from a nonblocking byte stream.
///
/// Reads never request more than the bytes missing from the current frame,
/// so frame boundaries cannot drift. A partial frame left over when the
/// stream runs dry is kept until the next notification completes it.
#[derive(Debug)]
pub struct FrameAssembler {
    frame_size: usize,
    staging: BytesMut,
    valid: usize,
    stats: AssemblerStats,
}

impl FrameAssembler {
    /// Create an assembler for frames of `frame_size` bytes.
    pub fn new(frame_size: usize) -> Result<Self> {
        if frame_size == 0 {
            return Err(FrameError::InvalidFrameSize(frame_size));
        }
        Ok(Self {
            frame_size,
            staging: zeroed(frame_size),
            valid: 0,
            stats: AssemblerStats::default(),
        })
    }

    /// Create an assembler sized for `descriptor`.
    pub fn for_descriptor(descriptor: &ScanDescriptor) -> Self {
        let frame_size = descriptor.frame_size();
        Self {
            frame_size,
            staging: zeroed(frame_size),
            valid: 0,
            stats: AssemblerStats::default(),
        }
    }

    /// Size of one frame in bytes.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Bytes of the current partial frame.
    pub fn pending(&self) -> usize {
        self.valid
    }

    /// Running counters.
    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }

    /// Discard any partial frame.
    pub fn reset(&mut self) {
        if self.valid > 0 {
            debug!(pending = self.valid, "discarding partial frame");
        }
        self.valid = 0;
    }

    /// Read until the source reports `WouldBlock`, handing every completed
    /// frame to `on_frame` in stream order.
    ///
    /// `Interrupted` reads are retried. End-of-file and every other error
    /// are fatal. Returns the number of frames completed.
    pub fn drain<R, F>(&mut self, src: &mut R, mut on_frame: F) -> Result<usize>
    where
        R: Read + ?Sized,
        F: FnMut(RawFrame),
    {
        let mut completed = 0usize;
        loop {
            let read = match src.read(&mut self.staging[self.valid..]) {
                Ok(0) => {
                    return Err(FrameError::EndOfStream {
                        pending: self.valid,
                    })
                }
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => return Err(FrameError::Io(err)),
            };

            self.valid += read;
            self.stats.bytes += read as u64;
            if self.valid == self.frame_size {
                on_frame(self.take_frame());
                completed += 1;
            }
        }

        if self.valid > 0 {
            trace!(pending = self.valid, "partial frame retained");
        }
        Ok(completed)
    }

    /// Drain the source and return only the newest completed frame.
    ///
    /// Older frames completed in the same call are dropped and counted in
    /// [`AssemblerStats::superseded`].
    pub fn read_latest<R>(&mut self, src: &mut R) -> Result<Option<RawFrame>>
    where
        R: Read + ?Sized,
    {
        let mut latest = None;
        let mut superseded = 0u64;
        self.drain(src, |frame| {
            if latest.replace(frame).is_some() {
                superseded += 1;
            }
        })?;

        if superseded > 0 {
            self.stats.superseded += superseded;
            debug!(superseded, "dropped older frames, keeping newest");
        }
        Ok(latest)
    }

    fn take_frame(&mut self) -> RawFrame {
        let bytes = self.staging.split().freeze();
        self.staging.resize(self.frame_size, 0);
        self.valid = 0;
        self.stats.frames += 1;
        RawFrame { bytes }
    }
}

fn zeroed(len: usize) -> BytesMut {
    let mut buf = BytesMut::with_capacity(len);
    buf.resize(len, 0);
    buf
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::{Error, Write};

    use super::*;

    /// One scripted `read` outcome.
    enum Step {
        Data(Vec<u8>),
        WouldBlock,
        Interrupted,
        Fail(ErrorKind),
        Eof,
    }

    /// Serves each data chunk across as many reads as the caller's buffer
    /// requires, then moves on to the next step.
    struct ScriptedReader {
        steps: VecDeque<Step>,
        reads: usize,
    }

    impl ScriptedReader {
        fn new(steps: impl IntoIterator<Item = Step>) -> Self {
            Self {
                steps: steps.into_iter().collect(),
                reads: 0,
            }
        }

        fn chunked(bytes: &[u8], chunk: usize) -> Self {
            let mut steps: Vec<Step> = bytes
                .chunks(chunk)
                .map(|c| Step::Data(c.to_vec()))
                .collect();
            steps.push(Step::WouldBlock);
            Self::new(steps)
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.reads += 1;
            match self.steps.pop_front() {
                Some(Step::Data(mut data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        self.steps.push_front(Step::Data(data.split_off(n)));
                    }
                    Ok(n)
                }
                Some(Step::WouldBlock) | None => Err(Error::from(ErrorKind::WouldBlock)),
                Some(Step::Interrupted) => Err(Error::from(ErrorKind::Interrupted)),
                Some(Step::Fail(kind)) => Err(Error::from(kind)),
                Some(Step::Eof) => Ok(0),
            }
        }
    }

    fn stream(frames: usize, frame_size: usize) -> Vec<u8> {
        (0..frames * frame_size).map(|i| i as u8).collect()
    }

    fn collect(assembler: &mut FrameAssembler, reader: &mut ScriptedReader) -> Vec<RawFrame> {
        let mut frames = Vec::new();
        assembler
            .drain(reader, |frame| frames.push(frame))
            .expect("drain should succeed");
        frames
    }

    #[test]
    fn rejects_zero_frame_size() {
        assert!(matches!(
            FrameAssembler::new(0),
            Err(FrameError::InvalidFrameSize(0))
        ));
    }

    #[test]
    fn any_chunking_yields_every_frame_in_order() {
        let frame_size = 6;
        let frames = 5;
        let bytes = stream(frames, frame_size);

        for chunk in [1, 2, 4, 5, 6, 7, 12, 13, 30] {
            let mut assembler = FrameAssembler::new(frame_size).unwrap();
            let mut reader = ScriptedReader::chunked(&bytes, chunk);
            let out = collect(&mut assembler, &mut reader);

            assert_eq!(out.len(), frames, "chunk size {chunk}");
            for (i, frame) in out.iter().enumerate() {
                assert_eq!(frame.len(), frame_size);
                assert_eq!(
                    frame.as_bytes(),
                    &bytes[i * frame_size..(i + 1) * frame_size],
                    "chunk size {chunk}, frame {i}"
                );
            }
            assert_eq!(assembler.pending(), 0);
            assert_eq!(assembler.stats().frames, frames as u64);
            assert_eq!(assembler.stats().bytes, bytes.len() as u64);
        }
    }

    #[test]
    fn irregular_chunks_yield_every_frame() {
        let bytes = stream(3, 8);
        let mut reader = ScriptedReader::new([
            Step::Data(bytes[..3].to_vec()),
            Step::Data(bytes[3..17].to_vec()),
            Step::Data(bytes[17..18].to_vec()),
            Step::Data(bytes[18..].to_vec()),
            Step::WouldBlock,
        ]);
        let mut assembler = FrameAssembler::new(8).unwrap();
        let out = collect(&mut assembler, &mut reader);

        let joined: Vec<u8> = out.iter().flat_map(|f| f.as_bytes().to_vec()).collect();
        assert_eq!(joined, bytes);
    }

    #[test]
    fn partial_frame_survives_exhaustion() {
        let bytes = stream(1, 6);
        let mut assembler = FrameAssembler::new(6).unwrap();

        let mut first = ScriptedReader::new([Step::Data(bytes[..4].to_vec()), Step::WouldBlock]);
        assert!(collect(&mut assembler, &mut first).is_empty());
        assert_eq!(assembler.pending(), 4);

        let mut second = ScriptedReader::new([Step::Data(bytes[4..].to_vec()), Step::WouldBlock]);
        let out = collect(&mut assembler, &mut second);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_bytes(), bytes.as_slice());
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn reads_never_exceed_missing_bytes() {
        struct Recording {
            requested: Vec<usize>,
            served: usize,
        }
        impl Read for Recording {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                self.requested.push(buf.len());
                if self.served >= 2 {
                    return Err(Error::from(ErrorKind::WouldBlock));
                }
                self.served += 1;
                let n = buf.len().min(4);
                buf[..n].fill(0xAA);
                Ok(n)
            }
        }

        let mut assembler = FrameAssembler::new(6).unwrap();
        let mut src = Recording {
            requested: Vec::new(),
            served: 0,
        };
        let completed = assembler.drain(&mut src, |_| {}).unwrap();

        assert_eq!(completed, 1);
        assert_eq!(src.requested, vec![6, 2, 6]);
    }

    #[test]
    fn read_latest_keeps_newest_frame() {
        let bytes = stream(3, 4);
        let mut assembler = FrameAssembler::new(4).unwrap();
        let mut reader = ScriptedReader::chunked(&bytes, 12);

        let frame = assembler.read_latest(&mut reader).unwrap().unwrap();
        assert_eq!(frame.as_bytes(), &bytes[8..12]);
        assert_eq!(assembler.stats().frames, 3);
        assert_eq!(assembler.stats().superseded, 2);
    }

    #[test]
    fn read_latest_without_complete_frame_is_none() {
        let mut assembler = FrameAssembler::new(4).unwrap();
        let mut reader = ScriptedReader::new([Step::Data(vec![1, 2]), Step::WouldBlock]);

        assert!(assembler.read_latest(&mut reader).unwrap().is_none());
        assert_eq!(assembler.pending(), 2);

        let mut empty = ScriptedReader::new([Step::WouldBlock]);
        assert!(assembler.read_latest(&mut empty).unwrap().is_none());
        assert_eq!(assembler.pending(), 2);
    }

    #[test]
    fn interrupted_read_retries() {
        let mut assembler = FrameAssembler::new(2).unwrap();
        let mut reader = ScriptedReader::new([
            Step::Interrupted,
            Step::Data(vec![7, 8]),
            Step::WouldBlock,
        ]);
        let out = collect(&mut assembler, &mut reader);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_bytes(), &[7, 8]);
    }

    #[test]
    fn other_read_errors_are_fatal() {
        let mut assembler = FrameAssembler::new(2).unwrap();
        let mut reader = ScriptedReader::new([Step::Data(vec![1]), Step::Fail(ErrorKind::Other)]);
        let err = assembler.drain(&mut reader, |_| {}).unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::Other));
    }

    #[test]
    fn end_of_stream_is_fatal() {
        let mut assembler = FrameAssembler::new(4).unwrap();
        let mut reader = ScriptedReader::new([Step::Data(vec![1, 2, 3]), Step::Eof]);
        let err = assembler.read_latest(&mut reader).unwrap_err();
        assert!(matches!(err, FrameError::EndOfStream { pending: 3 }));
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut assembler = FrameAssembler::new(4).unwrap();
        let mut reader = ScriptedReader::new([Step::Data(vec![9, 9]), Step::WouldBlock]);
        assembler.drain(&mut reader, |_| {}).unwrap();
        assembler.reset();
        assert_eq!(assembler.pending(), 0);

        let mut next = ScriptedReader::new([Step::Data(vec![1, 2, 3, 4]), Step::WouldBlock]);
        let frame = assembler.read_latest(&mut next).unwrap().unwrap();
        assert_eq!(frame.as_bytes(), &[1, 2, 3, 4]);
        assert_eq!(next.reads, 2);
    }

    #[test]
    fn frames_over_nonblocking_socket() {
        let (mut left, mut right) = std::os::unix::net::UnixStream::pair().unwrap();
        right.set_nonblocking(true).unwrap();
        let mut assembler = FrameAssembler::new(6).unwrap();

        left.write_all(&[1, 2, 3, 4]).unwrap();
        assert!(assembler.read_latest(&mut right).unwrap().is_none());

        left.write_all(&[5, 6, 7]).unwrap();
        let frame = assembler.read_latest(&mut right).unwrap().unwrap();
        assert_eq!(frame.as_bytes(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(assembler.pending(), 1);
    }

    #[test]
    fn raw_frame_checks_length() {
        assert!(RawFrame::new(vec![0u8; 6], 6).is_ok());
        assert!(matches!(
            RawFrame::new(vec![0u8; 5], 6),
            Err(FrameError::FrameLength {
                expected: 6,
                actual: 5
            })
        ));
    }
}
