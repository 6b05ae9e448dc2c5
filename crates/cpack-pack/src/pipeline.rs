//! Output encoding chain and the streaming writer pipeline.
//!
//! Bytes written to the pipeline pass through gzip and then base64 before
//! reaching the base sink, so the artifact is `base64(gzip(text))`. The
//! stages are wrapped around the sink outward (base64 first, gzip on top)
//! and closed in the reverse order.

use std::io::{self, Write};

use base64::engine::GeneralPurpose;
use base64::engine::general_purpose::STANDARD;
use base64::write::EncoderWriter;
use flate2::Compression;
use flate2::write::GzEncoder;
use strum::Display;

use cpack_core::PackError;

/// One layer of the output chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Stage {
    #[strum(to_string = "base64 encoder")]
    Base64,
    #[strum(to_string = "gzip writer")]
    Gzip,
    #[strum(to_string = "output file")]
    Sink,
}

/// The encoding stages selected for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodingChain {
    stages: Vec<Stage>,
}

impl EncodingChain {
    /// Select the stages from the configuration flags.
    ///
    /// Base64 is only valid on top of gzip.
    pub fn from_flags(gzip: bool, base64: bool) -> Result<Self, PackError> {
        let stages = match (gzip, base64) {
            (false, false) => Vec::new(),
            (true, false) => vec![Stage::Gzip],
            (true, true) => vec![Stage::Base64, Stage::Gzip],
            (false, true) => return Err(PackError::invalid_config("--base64 requires --gzip")),
        };
        Ok(Self { stages })
    }

    /// Wrap steps in construction order, outward from the sink.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Stages in the order they must be closed, ending with the sink.
    pub fn close_order(&self) -> Vec<Stage> {
        self.stages
            .iter()
            .rev()
            .copied()
            .chain(std::iter::once(Stage::Sink))
            .collect()
    }

    pub fn is_gzip(&self) -> bool {
        self.stages.contains(&Stage::Gzip)
    }

    pub fn is_base64(&self) -> bool {
        self.stages.contains(&Stage::Base64)
    }
}

type Base64Writer<W> = EncoderWriter<'static, GeneralPurpose, W>;

enum Chain<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
    GzipBase64(GzEncoder<Base64Writer<W>>),
}

impl<W: Write> Chain<W> {
    fn build(sink: W, encoding: &EncodingChain) -> Self {
        match (encoding.is_gzip(), encoding.is_base64()) {
            (true, true) => {
                let base64 = EncoderWriter::new(sink, &STANDARD);
                Self::GzipBase64(GzEncoder::new(base64, Compression::default()))
            }
            (true, false) => Self::Gzip(GzEncoder::new(sink, Compression::default())),
            _ => Self::Plain(sink),
        }
    }

    /// Close every stage, innermost writer last.
    fn close(self) -> Result<W, PackError> {
        let mut sink = match self {
            Self::Plain(sink) => sink,
            Self::Gzip(gzip) => gzip.finish().map_err(|e| close_error(Stage::Gzip, e))?,
            Self::GzipBase64(gzip) => {
                let mut base64 = gzip.finish().map_err(|e| close_error(Stage::Gzip, e))?;
                base64
                    .finish()
                    .map_err(|e| close_error(Stage::Base64, e))?
            }
        };
        sink.flush().map_err(|e| close_error(Stage::Sink, e))?;
        Ok(sink)
    }
}

impl<W: Write> Write for Chain<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            Self::Gzip(w) => w.write(buf),
            Self::GzipBase64(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Gzip(w) => w.flush(),
            Self::GzipBase64(w) => w.flush(),
        }
    }
}

fn close_error(stage: Stage, source: io::Error) -> PackError {
    PackError::Close {
        stage: stage.to_string(),
        source,
    }
}

/// Streaming writer over the encoding chain.
///
/// In verbose mode file blocks are held in memory so the summary can be
/// written ahead of them; otherwise they stream straight into the chain.
pub struct OutputPipeline<W: Write> {
    chain: Chain<W>,
    encoding: EncodingChain,
    buffer: Option<Vec<u8>>,
}

impl<W: Write> OutputPipeline<W> {
    pub fn new(sink: W, encoding: &EncodingChain, verbose: bool) -> Self {
        Self {
            chain: Chain::build(sink, encoding),
            encoding: encoding.clone(),
            buffer: verbose.then(Vec::new),
        }
    }

    pub fn is_buffering(&self) -> bool {
        self.buffer.is_some()
    }

    /// Write one rendered file block.
    pub fn write_content(&mut self, bytes: &[u8]) -> Result<(), PackError> {
        match &mut self.buffer {
            Some(buffer) => {
                buffer.extend_from_slice(bytes);
                Ok(())
            }
            None => self
                .chain
                .write_all(bytes)
                .map_err(|source| PackError::Write {
                    context: "file content",
                    source,
                }),
        }
    }

    /// Write the summary and any buffered content, then close every stage.
    ///
    /// Returns the base sink and the stages in the order they were closed.
    pub fn finish(mut self, summary: Option<&str>) -> Result<(W, Vec<Stage>), PackError> {
        if let Some(summary) = summary {
            self.chain
                .write_all(summary.as_bytes())
                .map_err(|source| PackError::Write {
                    context: "summary",
                    source,
                })?;
        }
        if let Some(buffer) = self.buffer.take() {
            self.chain
                .write_all(&buffer)
                .map_err(|source| PackError::Write {
                    context: "file content",
                    source,
                })?;
        }

        let closed = self.encoding.close_order();
        let sink = self.chain.close()?;
        for stage in &closed {
            tracing::debug!("Closed {stage}");
        }
        Ok((sink, closed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn gunzip(bytes: &[u8]) -> String {
        let mut out = String::new();
        GzDecoder::new(bytes).read_to_string(&mut out).unwrap();
        out
    }

    struct FailingFlush;

    impl Write for FailingFlush {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    #[test]
    fn test_chain_selection() {
        assert!(EncodingChain::from_flags(false, false).unwrap().stages().is_empty());
        assert_eq!(
            EncodingChain::from_flags(true, false).unwrap().stages(),
            &[Stage::Gzip]
        );
        assert_eq!(
            EncodingChain::from_flags(true, true).unwrap().stages(),
            &[Stage::Base64, Stage::Gzip]
        );
        assert!(matches!(
            EncodingChain::from_flags(false, true),
            Err(PackError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_close_order() {
        let chain = EncodingChain::from_flags(true, true).unwrap();
        assert_eq!(
            chain.close_order(),
            vec![Stage::Gzip, Stage::Base64, Stage::Sink]
        );
        assert_eq!(EncodingChain::default().close_order(), vec![Stage::Sink]);
    }

    #[test]
    fn test_plain_streaming() {
        let mut pipeline = OutputPipeline::new(Vec::new(), &EncodingChain::default(), false);
        pipeline.write_content(b"one ").unwrap();
        pipeline.write_content(b"two").unwrap();
        let (out, closed) = pipeline.finish(None).unwrap();
        assert_eq!(out, b"one two");
        assert_eq!(closed, vec![Stage::Sink]);
    }

    #[test]
    fn test_verbose_writes_summary_first() {
        let mut pipeline = OutputPipeline::new(Vec::new(), &EncodingChain::default(), true);
        assert!(pipeline.is_buffering());
        pipeline.write_content(b"content").unwrap();
        let (out, _) = pipeline.finish(Some("summary\n")).unwrap();
        assert_eq!(out, b"summary\ncontent");
    }

    #[test]
    fn test_gzip_round_trip() {
        let chain = EncodingChain::from_flags(true, false).unwrap();
        let mut pipeline = OutputPipeline::new(Vec::new(), &chain, false);
        pipeline.write_content(b"hello gzip").unwrap();
        let (out, closed) = pipeline.finish(None).unwrap();
        assert_eq!(gunzip(&out), "hello gzip");
        assert_eq!(closed, vec![Stage::Gzip, Stage::Sink]);
    }

    #[test]
    fn test_gzip_base64_round_trip() {
        let chain = EncodingChain::from_flags(true, true).unwrap();
        let mut pipeline = OutputPipeline::new(Vec::new(), &chain, true);
        pipeline.write_content(b"body").unwrap();
        let (out, _) = pipeline.finish(Some("head ")).unwrap();

        let decoded = STANDARD.decode(&out).unwrap();
        assert_eq!(gunzip(&decoded), "head body");
    }

    #[test]
    fn test_close_error_names_stage() {
        let pipeline = OutputPipeline::new(FailingFlush, &EncodingChain::default(), false);
        match pipeline.finish(None) {
            Err(PackError::Close { stage, .. }) => assert_eq!(stage, "output file"),
            other => panic!("expected close error, got {:?}", other.map(|(_, s)| s)),
        }
    }
}
