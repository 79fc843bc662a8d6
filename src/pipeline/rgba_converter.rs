use std::convert::TryFrom;

use anyhow::{Result, anyhow, bail};
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgba, yuyv422_to_rgba,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

/// Pixel layouts a capture device can hand us.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceLayout {
    Nv12,
    Yuyv,
    Mjpeg,
    Rgb,
    Bgr,
    Gray,
}

#[derive(Debug)]
pub struct RgbaFrame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RgbaFrame {
    /// Flips the frame left to right, for a selfie view.
    pub fn mirror_horizontally(&mut self) {
        let row_len = self.width as usize * 4;
        if row_len == 0 {
            return;
        }
        self.rgba.par_chunks_exact_mut(row_len).for_each(|row| {
            let mut left = 0;
            let mut right = row_len - 4;
            while left < right {
                for channel in 0..4 {
                    row.swap(left + channel, right + channel);
                }
                left += 4;
                right -= 4;
            }
        });
    }
}

#[cfg(feature = "camera-nokhwa")]
pub fn convert_camera_frame(frame: &nokhwa::Buffer) -> Result<RgbaFrame> {
    use nokhwa::utils::FrameFormat;

    let resolution = frame.resolution();
    let layout = match frame.source_frame_format() {
        FrameFormat::NV12 => SourceLayout::Nv12,
        FrameFormat::YUYV => SourceLayout::Yuyv,
        FrameFormat::MJPEG => SourceLayout::Mjpeg,
        FrameFormat::RAWRGB => SourceLayout::Rgb,
        FrameFormat::RAWBGR => SourceLayout::Bgr,
        FrameFormat::GRAY => SourceLayout::Gray,
    };
    to_rgba(layout, frame.buffer(), resolution.width_x, resolution.height_y)
}

pub fn to_rgba(layout: SourceLayout, data: &[u8], width: u32, height: u32) -> Result<RgbaFrame> {
    if width == 0 || height == 0 {
        bail!("empty frame {width}x{height}");
    }

    let rgba = match layout {
        SourceLayout::Nv12 => nv12_to_rgba(data, width, height)?,
        SourceLayout::Yuyv => yuyv_to_rgba(data, width, height)?,
        SourceLayout::Mjpeg => mjpeg_to_rgba(data, width, height)?,
        SourceLayout::Rgb => packed_rgb_to_rgba(data, width, height, false)?,
        SourceLayout::Bgr => packed_rgb_to_rgba(data, width, height, true)?,
        SourceLayout::Gray => gray_to_rgba(data, width, height)?,
    };

    Ok(RgbaFrame {
        rgba,
        width,
        height,
    })
}

fn check_len(kind: &str, data: &[u8], expected: usize) -> Result<()> {
    if data.len() < expected {
        bail!(
            "{kind} buffer too small: got {}, expected {expected}",
            data.len()
        );
    }
    Ok(())
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

fn nv12_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let y_plane_len = pixel_count(width, height);
    let uv_plane_len = y_plane_len / 2;
    check_len("NV12", data, y_plane_len + uv_plane_len)?;

    let image = YuvBiPlanarImage {
        y_plane: &data[..y_plane_len],
        y_stride: width,
        uv_plane: &data[y_plane_len..y_plane_len + uv_plane_len],
        uv_stride: width,
        width,
        height,
    };

    let mut rgba = vec![0u8; y_plane_len * 4];
    yuv_nv12_to_rgba(
        &image,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12 to RGBA failed: {err:?}"))?;

    Ok(rgba)
}

fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    check_len("YUYV", data, pixel_count(width, height) * 2)?;

    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };

    let mut rgba = vec![0u8; pixel_count(width, height) * 4];
    yuyv422_to_rgba(
        &packed,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| anyhow!("YUYV422 to RGBA failed: {err:?}"))?;

    Ok(rgba)
}

fn mjpeg_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let rgba = decoder
        .decode()
        .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;

    if let Some(info) = decoder.info() {
        let decoded_w = usize::try_from(info.width)
            .map_err(|_| anyhow!("MJPEG width does not fit usize"))?;
        let decoded_h = usize::try_from(info.height)
            .map_err(|_| anyhow!("MJPEG height does not fit usize"))?;
        if decoded_w != width as usize || decoded_h != height as usize {
            bail!(
                "MJPEG frame is {decoded_w}x{decoded_h}, camera reported {width}x{height}"
            );
        }
    }
    check_len("MJPEG", &rgba, pixel_count(width, height) * 4)?;

    Ok(rgba)
}

fn packed_rgb_to_rgba(data: &[u8], width: u32, height: u32, swap_rb: bool) -> Result<Vec<u8>> {
    let pixels = pixel_count(width, height);
    check_len(if swap_rb { "BGR" } else { "RGB" }, data, pixels * 3)?;

    let mut rgba = vec![0u8; pixels * 4];
    rgba.par_chunks_exact_mut(4)
        .zip(data.par_chunks_exact(3))
        .for_each(|(dst, src)| {
            let (r, b) = if swap_rb {
                (src[2], src[0])
            } else {
                (src[0], src[2])
            };
            dst.copy_from_slice(&[r, src[1], b, 255]);
        });

    Ok(rgba)
}

fn gray_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let pixels = pixel_count(width, height);
    check_len("GRAY", data, pixels)?;

    let mut rgba = vec![0u8; pixels * 4];
    rgba.par_chunks_exact_mut(4)
        .zip(data[..pixels].par_iter().copied())
        .for_each(|(dst, value)| dst.copy_from_slice(&[value, value, value, 255]));

    Ok(rgba)
}
