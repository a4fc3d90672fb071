//! Synthetic input generation.
//!
//! Each submission gets a fresh random frame wrapped as a U8 NHWC blob with
//! a random region-of-interest crop, so consecutive requests never see the
//! same pixels.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{ Rng, SeedableRng };

use crate::constants::{ ROI_RATIO_MAX, ROI_RATIO_MIN };
use crate::error::{ Result, RingflightError };
use crate::runtime::{ Layout, Precision };

/// Region of interest inside a frame (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/// Shape and element type of a tensor. `dims` is always N, C, H, W.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorDesc {
    pub precision: Precision,
    pub dims: [usize; 4],
    pub layout: Layout,
}

impl TensorDesc {
    pub fn channels(&self) -> usize {
        self.dims[1]
    }

    pub fn height(&self) -> usize {
        self.dims[2]
    }

    pub fn width(&self) -> usize {
        self.dims[3]
    }
}

/// Dense input tensor plus the crop the runtime should read.
#[derive(Debug, Clone)]
pub struct InputBlob {
    pub desc: TensorDesc,
    pub data: Arc<[u8]>,
    pub roi: Roi,
}

impl InputBlob {
    /// Pixel value at (x, y, channel), in full-frame coordinates
    #[inline]
    pub fn pixel(&self, x: usize, y: usize, channel: usize) -> u8 {
        let (channels, height, width) = (self.desc.channels(), self.desc.height(), self.desc.width());
        let index = match self.desc.layout {
            Layout::Nhwc => (y * width + x) * channels + channel,
            Layout::Nchw => (channel * height + y) * width + x,
        };
        self.data[index]
    }

    /// Same pixels repacked into `layout`. Shares the buffer when no
    /// repacking is needed.
    pub fn to_layout(&self, layout: Layout) -> InputBlob {
        if self.desc.layout == layout {
            return self.clone();
        }
        let (channels, height, width) = (self.desc.channels(), self.desc.height(), self.desc.width());
        let mut data = Vec::with_capacity(self.data.len());
        match layout {
            Layout::Nchw => {
                for ch in 0..channels {
                    for y in 0..height {
                        for x in 0..width {
                            data.push(self.pixel(x, y, ch));
                        }
                    }
                }
            }
            Layout::Nhwc => {
                for y in 0..height {
                    for x in 0..width {
                        for ch in 0..channels {
                            data.push(self.pixel(x, y, ch));
                        }
                    }
                }
            }
        }
        InputBlob {
            desc: TensorDesc { layout, ..self.desc },
            data: data.into(),
            roi: self.roi,
        }
    }
}

/// Interleaved 8-bit image with explicit strides.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    /// Bytes between the starts of two rows
    pub row_stride: usize,
    /// Bytes between the starts of two pixels
    pub pixel_stride: usize,
    pub data: Vec<u8>,
}

impl Frame {
    /// Densely packed frame filled with uniform random bytes.
    pub fn random<R: Rng>(width: usize, height: usize, channels: usize, rng: &mut R) -> Self {
        let mut data = vec![0u8; width * height * channels];
        rng.fill(&mut data[..]);
        Self {
            width,
            height,
            channels,
            row_stride: width * channels,
            pixel_stride: channels,
            data,
        }
    }

    pub fn is_dense(&self) -> bool {
        self.pixel_stride == self.channels && self.row_stride == self.channels * self.width
    }

    /// Wrap the frame as an NHWC blob cropped to `roi`.
    ///
    /// Only dense frames are accepted; padded rows or pixels are rejected
    /// rather than repacked.
    pub fn into_blob(self, roi: Roi) -> Result<InputBlob> {
        if !self.is_dense() {
            return Err(
                RingflightError::layout(
                    format!(
                        "frame is not dense (row stride {}, pixel stride {}, {}x{}x{})",
                        self.row_stride,
                        self.pixel_stride,
                        self.width,
                        self.height,
                        self.channels
                    )
                )
            );
        }
        if roi.width == 0 || roi.height == 0 {
            return Err(RingflightError::layout("empty region of interest"));
        }
        if roi.x + roi.width > self.width || roi.y + roi.height > self.height {
            return Err(RingflightError::layout("region of interest exceeds frame"));
        }

        Ok(InputBlob {
            desc: TensorDesc {
                precision: Precision::U8,
                dims: [1, self.channels, self.height, self.width],
                layout: Layout::Nhwc,
            },
            data: self.data.into(),
            roi,
        })
    }
}

/// Random crop with per-axis ratios drawn from [`ROI_RATIO_MIN`, `ROI_RATIO_MAX`).
pub fn random_roi<R: Rng>(width: usize, height: usize, rng: &mut R) -> Roi {
    let ratio_h = rng.gen_range(ROI_RATIO_MIN..ROI_RATIO_MAX);
    let ratio_w = rng.gen_range(ROI_RATIO_MIN..ROI_RATIO_MAX);
    Roi {
        x: ((width as f64) * ratio_w) as usize,
        y: ((height as f64) * ratio_h) as usize,
        width: ((width as f64) * (1.0 - ratio_w)) as usize,
        height: ((height as f64) * (1.0 - ratio_h)) as usize,
    }
}

/// Source of per-submission input blobs.
pub trait InputSource: Send {
    fn next_input(&mut self) -> Result<InputBlob>;
}

/// Generates random dense frames with a random ROI.
pub struct RandomInput {
    width: usize,
    height: usize,
    channels: usize,
    rng: StdRng,
}

impl RandomInput {
    pub fn new(width: usize, height: usize, channels: usize) -> Result<Self> {
        Self::build(width, height, channels, StdRng::from_entropy())
    }

    /// Deterministic generator for reproducible runs
    pub fn with_seed(width: usize, height: usize, channels: usize, seed: u64) -> Result<Self> {
        Self::build(width, height, channels, StdRng::seed_from_u64(seed))
    }

    fn build(width: usize, height: usize, channels: usize, rng: StdRng) -> Result<Self> {
        // ROI sides are at least half the frame, so 2 pixels is the floor
        if width < 2 || height < 2 {
            return Err(RingflightError::config("Input frame must be at least 2x2"));
        }
        if channels == 0 {
            return Err(RingflightError::config("Input frame needs at least one channel"));
        }
        Ok(Self { width, height, channels, rng })
    }
}

impl InputSource for RandomInput {
    fn next_input(&mut self) -> Result<InputBlob> {
        let frame = Frame::random(self.width, self.height, self.channels, &mut self.rng);
        let roi = random_roi(self.width, self.height, &mut self.rng);
        frame.into_blob(roi)
    }
}
