//! Raw frame pipes to and from FFmpeg child processes.
//!
//! Decoders emit BGR24 frames on stdout; the encoder consumes BGR24
//! frames on stdin. All children are spawned with `kill_on_drop` so
//! every exit path, including panics, reaps them.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::debug;

use vmix_models::{EncodingProfile, OutputCadence};

use crate::command::stderr_tail;
use crate::encode::mix_quality_args;
use crate::error::{MediaError, MediaResult};

/// Pixel layout shared by every raw pipe.
pub const RAW_PIXEL_FORMAT: &str = "bgr24";
/// Bytes per pixel in [`RAW_PIXEL_FORMAT`].
pub const BYTES_PER_PIXEL: usize = 3;

/// A finite stream of raw frames decoded from one video file.
pub struct RawFrameSource {
    _child: Child,
    stdout: ChildStdout,
    frame_size: usize,
    buf: Vec<u8>,
    finished: bool,
}

impl RawFrameSource {
    /// Spawn a decoder for `path`, normalized to `width x height`.
    pub fn open(path: &Path, width: u32, height: u32) -> MediaResult<Self> {
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", RAW_PIXEL_FORMAT])
            .args(["-s", &format!("{}x{}", width, height)])
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::InvalidVideo("decoder stdout not captured".to_string()))?;

        let frame_size = width as usize * height as usize * BYTES_PER_PIXEL;
        Ok(Self {
            _child: child,
            stdout,
            frame_size,
            buf: vec![0u8; frame_size],
            finished: false,
        })
    }

    /// Read the next frame into the internal buffer.
    ///
    /// Returns `false` once the stream ends; a trailing partial frame
    /// counts as end of stream.
    pub async fn advance(&mut self) -> MediaResult<bool> {
        if self.finished {
            return Ok(false);
        }
        match self.stdout.read_exact(&mut self.buf).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.finished = true;
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The frame read by the last successful [`advance`](Self::advance).
    pub fn frame(&self) -> &[u8] {
        &self.buf
    }

    /// Read and return the next frame, or `None` at end of stream.
    pub async fn next_frame(&mut self) -> MediaResult<Option<&[u8]>> {
        if self.advance().await? {
            Ok(Some(self.frame()))
        } else {
            Ok(None)
        }
    }
}

/// An infinite, restartable, cyclic stream of raw frames.
///
/// When the underlying decode ends, decoding restarts from the
/// beginning of the file, so the stream never runs out. A source whose
/// fresh restart immediately ends is rejected rather than spun on.
pub struct CyclicFrameSource {
    path: PathBuf,
    width: u32,
    height: u32,
    inner: RawFrameSource,
}

impl CyclicFrameSource {
    /// Spawn the first decode cycle for `path`.
    pub fn open(path: &Path, width: u32, height: u32) -> MediaResult<Self> {
        let inner = RawFrameSource::open(path, width, height)?;
        Ok(Self {
            path: path.to_path_buf(),
            width,
            height,
            inner,
        })
    }

    /// Read the next frame, restarting the decode at end of stream.
    pub async fn next_frame(&mut self) -> MediaResult<&[u8]> {
        if !self.inner.advance().await? {
            debug!("cover stream exhausted, restarting decode of {}", self.path.display());
            self.inner = RawFrameSource::open(&self.path, self.width, self.height)?;
            if !self.inner.advance().await? {
                return Err(MediaError::InvalidVideo(format!(
                    "cyclic source {} produced no frames after restart",
                    self.path.display()
                )));
            }
        }
        Ok(self.inner.frame())
    }
}

/// Raw-frame input pipe into an encoder child.
pub struct RawFrameSink {
    child: Child,
    stdin: Option<ChildStdin>,
    frame_size: usize,
    frames_written: u64,
}

impl RawFrameSink {
    /// Spawn an encoder writing `output` at the given cadence.
    pub fn open(
        output: &Path,
        width: u32,
        height: u32,
        cadence: OutputCadence,
        profile: &EncodingProfile,
        use_gpu: bool,
    ) -> MediaResult<Self> {
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-v".into(),
            "error".into(),
            "-f".into(),
            "rawvideo".into(),
            "-vcodec".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            RAW_PIXEL_FORMAT.into(),
            "-s".into(),
            format!("{}x{}", width, height),
            "-r".into(),
            cadence.as_u32().to_string(),
            "-i".into(),
            "-".into(),
        ];
        args.extend(mix_quality_args(profile, use_gpu));
        args.push("-pix_fmt".into());
        args.push("yuv420p".into());
        args.push(output.to_string_lossy().to_string());

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::InvalidVideo("encoder stdin not captured".to_string()))?;

        Ok(Self {
            child,
            stdin: Some(stdin),
            frame_size: width as usize * height as usize * BYTES_PER_PIXEL,
            frames_written: 0,
        })
    }

    /// Push one frame to the encoder.
    ///
    /// The write awaits until the encoder has drained the pipe far
    /// enough; this is the pipeline's backpressure point.
    pub async fn write_frame(&mut self, frame: &[u8]) -> MediaResult<()> {
        if frame.len() != self.frame_size {
            return Err(MediaError::InvalidVideo(format!(
                "frame size mismatch: got {} bytes, expected {}",
                frame.len(),
                self.frame_size
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MediaError::InvalidVideo("encoder sink already closed".to_string()))?;
        stdin.write_all(frame).await?;
        self.frames_written += 1;
        Ok(())
    }

    /// Number of frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Close the pipe and wait for the encoder to finish.
    pub async fn finish(mut self) -> MediaResult<u64> {
        // Closing stdin signals end of stream to the encoder.
        drop(self.stdin.take());

        let output = self.child.wait_with_output().await?;
        if !output.status.success() {
            return Err(MediaError::encode_failed(
                "raw-frame encoder exited with non-zero status",
                Some(stderr_tail(&output.stderr)),
                output.status.code(),
            ));
        }
        Ok(self.frames_written)
    }
}
