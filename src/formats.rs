// src/formats.rs

use serde_json::{json, Map, Value};

/// Every selectable format key, in menu order.
pub const FORMAT_KEYS: [&str; 8] = [
    "video_best",
    "video_1080",
    "video_720",
    "video_480",
    "audio_mp3",
    "audio_mp3_128",
    "audio_m4a",
    "audio_opus",
];

/// Whether an `ffmpeg` binary is reachable on `PATH`. Merging separate
/// video/audio streams and transcoding to mp3 both need it.
pub fn detect_ffmpeg() -> bool {
    which::which("ffmpeg").is_ok()
}

fn mp3_postprocessor(quality: &str) -> Value {
    json!([{
        "key": "FFmpegExtractAudio",
        "preferredcodec": "mp3",
        "preferredquality": quality,
    }])
}

fn merged_video(opts: &mut Map<String, Value>, selector: &str) {
    opts.insert("format".into(), json!(selector));
    opts.insert("merge_output_format".into(), json!("mp4"));
}

/// Resolves a format key into the provider option bag. Unknown keys fall
/// back to the provider's plain `best`.
pub fn format_options(format_key: &str, has_ffmpeg: bool) -> Map<String, Value> {
    let mut opts = Map::new();
    match format_key {
        "video_best" => {
            if has_ffmpeg {
                merged_video(&mut opts, "bestvideo+bestaudio/best");
            } else {
                opts.insert("format".into(), json!("best[ext=mp4]/best"));
            }
        }
        "video_1080" => {
            if has_ffmpeg {
                merged_video(&mut opts, "bestvideo[height<=1080]+bestaudio/best[height<=1080]");
            } else {
                opts.insert("format".into(), json!("best[height<=1080][ext=mp4]/best"));
            }
        }
        "video_720" => {
            if has_ffmpeg {
                merged_video(&mut opts, "bestvideo[height<=720]+bestaudio/best[height<=720]");
            } else {
                opts.insert("format".into(), json!("b[height<=720][ext=mp4]/best"));
            }
        }
        "video_480" => {
            if has_ffmpeg {
                merged_video(&mut opts, "bestvideo[height<=480]+bestaudio/best[height<=480]");
            } else {
                opts.insert("format".into(), json!("b[height<=480][ext=mp4]/best"));
            }
        }
        "audio_mp3" => {
            opts.insert("format".into(), json!("bestaudio/best"));
            if has_ffmpeg {
                opts.insert("postprocessors".into(), mp3_postprocessor("320"));
            }
        }
        "audio_mp3_128" => {
            opts.insert("format".into(), json!("bestaudio/best"));
            if has_ffmpeg {
                opts.insert("postprocessors".into(), mp3_postprocessor("128"));
            }
        }
        "audio_m4a" => {
            opts.insert("format".into(), json!("bestaudio[ext=m4a]/bestaudio/best"));
        }
        "audio_opus" => {
            opts.insert("format".into(), json!("bestaudio[ext=opus]/bestaudio/best"));
        }
        _ => {
            opts.insert("format".into(), json!("best"));
        }
    }
    opts
}
