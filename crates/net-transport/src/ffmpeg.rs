//! FFmpeg muxer backend
//!
//! Pushes Annex-B packets into an FFmpeg output context. With the default
//! `rtsp` format this announces the track to the server and streams RTP
//! interleaved over the RTSP connection.

use std::ffi::{CString, c_char, c_int};
use std::ptr;
use std::sync::Once;

use ffmpeg_sys_next::*;
use shared_protocol::VideoCodec;
use tracing::{debug, info, warn};

use crate::{
    MuxerBackend, OutboundFrame, TrackParams, TransportConfig, TransportError, TransportResult,
};

static NETWORK_INIT: Once = Once::new();

fn network_init() {
    NETWORK_INIT.call_once(|| {
        // SAFETY: called exactly once per process before any network output.
        let ret = unsafe { avformat_network_init() };
        if ret < 0 {
            warn!("avformat_network_init: {}", ffmpeg_error(ret));
        }
    });
}

/// Render an FFmpeg error code through `av_strerror`
fn ffmpeg_error(code: c_int) -> String {
    let mut buf = [0 as c_char; 256];
    // SAFETY: buf is writable for its full length and av_strerror always
    // NUL-terminates within the given size.
    let ret = unsafe { av_strerror(code, buf.as_mut_ptr(), buf.len()) };
    if ret < 0 {
        return format!("error {code}");
    }
    // SAFETY: NUL-terminated by av_strerror above.
    let message = unsafe { std::ffi::CStr::from_ptr(buf.as_ptr()) };
    format!("{} ({code})", message.to_string_lossy())
}

fn to_cstring(value: &str) -> TransportResult<CString> {
    CString::new(value)
        .map_err(|_| TransportError::InvalidDestination(format!("interior NUL in {value:?}")))
}

fn codec_id(codec: VideoCodec) -> AVCodecID {
    match codec {
        VideoCodec::H264 => AVCodecID::AV_CODEC_ID_H264,
        VideoCodec::Hevc => AVCodecID::AV_CODEC_ID_HEVC,
    }
}

/// Output context plus its single video stream
pub struct FfmpegMuxer {
    fmt_ctx: *mut AVFormatContext,
    stream: *mut AVStream,
    pkt: *mut AVPacket,
    owns_io: bool,
}

// SAFETY: the context is only touched by the thread that currently owns
// the transport; ownership moves with the muxer.
unsafe impl Send for FfmpegMuxer {}

impl FfmpegMuxer {
    pub fn new() -> Self {
        network_init();
        Self {
            fmt_ctx: ptr::null_mut(),
            stream: ptr::null_mut(),
            pkt: ptr::null_mut(),
            owns_io: false,
        }
    }

    fn set_option(&mut self, key: &str, value: &str) {
        let (Ok(k), Ok(v)) = (CString::new(key), CString::new(value)) else {
            return;
        };
        // SAFETY: fmt_ctx is a live context allocated in prepare().
        let ret = unsafe {
            av_opt_set(
                self.fmt_ctx.cast(),
                k.as_ptr(),
                v.as_ptr(),
                AV_OPT_SEARCH_CHILDREN as c_int,
            )
        };
        if ret < 0 {
            debug!("Muxer option {}={} not applied: {}", key, value, ffmpeg_error(ret));
        }
    }
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl MuxerBackend for FfmpegMuxer {
    fn name(&self) -> &'static str {
        "FFmpeg"
    }

    fn prepare(
        &mut self,
        destination: &str,
        track: &TrackParams,
        config: &TransportConfig,
    ) -> TransportResult<()> {
        self.release();

        let url = to_cstring(destination)?;
        let format = CString::new(config.format.as_str())
            .map_err(|_| TransportError::FormatNotFound(config.format.clone()))?;

        // SAFETY: all pointers passed are valid C strings or null.
        let oformat = unsafe { av_guess_format(format.as_ptr(), ptr::null(), ptr::null()) };
        if oformat.is_null() {
            return Err(TransportError::FormatNotFound(config.format.clone()));
        }

        let mut fmt_ctx: *mut AVFormatContext = ptr::null_mut();
        // SAFETY: fmt_ctx receives a newly allocated context on success.
        let ret = unsafe {
            avformat_alloc_output_context2(&mut fmt_ctx, oformat, format.as_ptr(), url.as_ptr())
        };
        if ret < 0 || fmt_ctx.is_null() {
            return Err(TransportError::OpenFailed(format!(
                "avformat_alloc_output_context2: {}",
                ffmpeg_error(ret)
            )));
        }
        self.fmt_ctx = fmt_ctx;

        for (key, value) in config.muxer_options() {
            self.set_option(key, &value);
        }

        // SAFETY: fmt_ctx is live; the stream is owned by the context.
        let stream = unsafe { avformat_new_stream(self.fmt_ctx, ptr::null()) };
        if stream.is_null() {
            self.release();
            return Err(TransportError::OpenFailed("avformat_new_stream failed".into()));
        }
        self.stream = stream;

        // SAFETY: stream and its codecpar were just allocated by FFmpeg.
        unsafe {
            (*stream).id = 0;
            (*stream).time_base = AVRational {
                num: 1,
                den: track.clock_rate as c_int,
            };
            let par = (*stream).codecpar;
            (*par).codec_type = AVMediaType::AVMEDIA_TYPE_VIDEO;
            (*par).codec_id = codec_id(track.codec);
            (*par).format = AVPixelFormat::AV_PIX_FMT_YUV420P as c_int;
            (*par).width = track.width as c_int;
            (*par).height = track.height as c_int;
        }

        // SAFETY: oformat comes from av_guess_format and outlives the context.
        let needs_io = unsafe { (*oformat).flags & AVFMT_NOFILE as c_int == 0 };
        if needs_io {
            // SAFETY: pb is the context's IO slot, filled on success.
            let ret =
                unsafe { avio_open(&mut (*self.fmt_ctx).pb, url.as_ptr(), AVIO_FLAG_WRITE as c_int) };
            if ret < 0 {
                self.release();
                return Err(TransportError::OpenFailed(format!(
                    "avio_open: {}",
                    ffmpeg_error(ret)
                )));
            }
            self.owns_io = true;
        }

        // SAFETY: plain allocation.
        self.pkt = unsafe { av_packet_alloc() };
        if self.pkt.is_null() {
            self.release();
            return Err(TransportError::OpenFailed("av_packet_alloc failed".into()));
        }

        debug!(
            format = %config.format,
            width = track.width,
            height = track.height,
            codec = %track.codec,
            "FFmpeg output prepared"
        );
        Ok(())
    }

    fn write_header(&mut self, config: &TransportConfig) -> TransportResult<()> {
        if self.fmt_ctx.is_null() {
            return Err(TransportError::NotOpen);
        }

        let mut options: *mut AVDictionary = ptr::null_mut();
        for (key, value) in config.header_options() {
            let (Ok(k), Ok(v)) = (CString::new(key), CString::new(value)) else {
                continue;
            };
            // SAFETY: av_dict_set copies key and value.
            unsafe { av_dict_set(&mut options, k.as_ptr(), v.as_ptr(), 0) };
        }

        // SAFETY: fmt_ctx is prepared; the dictionary is freed right after.
        let ret = unsafe { avformat_write_header(self.fmt_ctx, &mut options) };
        // SAFETY: options is either null or owned by us.
        unsafe { av_dict_free(&mut options) };

        if ret < 0 {
            return Err(TransportError::HeaderFailed(ffmpeg_error(ret)));
        }

        info!("FFmpeg header written");
        Ok(())
    }

    fn write_frame(&mut self, frame: &OutboundFrame<'_>) -> TransportResult<()> {
        if self.pkt.is_null() || self.stream.is_null() {
            return Err(TransportError::NotOpen);
        }

        let size = c_int::try_from(frame.data.len())
            .map_err(|_| TransportError::WriteFailed("packet too large".into()))?;

        // SAFETY: pkt is a live packet; av_new_packet gives it a buffer of
        // exactly `size` bytes that we fill before handing it to FFmpeg,
        // which takes ownership of the reference.
        unsafe {
            let ret = av_new_packet(self.pkt, size);
            if ret < 0 {
                return Err(TransportError::WriteFailed(format!(
                    "av_new_packet: {}",
                    ffmpeg_error(ret)
                )));
            }
            ptr::copy_nonoverlapping(frame.data.as_ptr(), (*self.pkt).data, frame.data.len());

            (*self.pkt).stream_index = (*self.stream).index;
            (*self.pkt).pts = frame.pts.unwrap_or(AV_NOPTS_VALUE);
            (*self.pkt).dts = frame.dts.unwrap_or(AV_NOPTS_VALUE);
            if frame.keyframe {
                (*self.pkt).flags |= AV_PKT_FLAG_KEY as c_int;
            }

            let ret = av_interleaved_write_frame(self.fmt_ctx, self.pkt);
            if ret < 0 {
                av_packet_unref(self.pkt);
                return Err(TransportError::WriteFailed(ffmpeg_error(ret)));
            }
        }

        Ok(())
    }

    fn write_trailer(&mut self) -> TransportResult<()> {
        if self.fmt_ctx.is_null() {
            return Err(TransportError::NotOpen);
        }

        // SAFETY: header was written on this context.
        let ret = unsafe { av_write_trailer(self.fmt_ctx) };
        if ret < 0 {
            return Err(TransportError::TrailerFailed(ffmpeg_error(ret)));
        }
        Ok(())
    }

    fn release(&mut self) {
        // SAFETY: each pointer is either null or exclusively owned here.
        unsafe {
            if !self.pkt.is_null() {
                av_packet_free(&mut self.pkt);
            }
            if !self.fmt_ctx.is_null() {
                if self.owns_io && !(*self.fmt_ctx).pb.is_null() {
                    avio_closep(&mut (*self.fmt_ctx).pb);
                }
                avformat_free_context(self.fmt_ctx);
            }
        }
        self.fmt_ctx = ptr::null_mut();
        self.stream = ptr::null_mut();
        self.pkt = ptr::null_mut();
        self.owns_io = false;
    }
}

impl Drop for FfmpegMuxer {
    fn drop(&mut self) {
        self.release();
    }
}
