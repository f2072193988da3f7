use std::fmt;
use std::path::{Path, PathBuf};

/// 解決済みの音声の場所
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioSource {
    /// ローカルファイル
    Local(PathBuf),

    /// 外部 URL（取得はプロバイダ側に任せる）
    Remote(String),
}

impl AudioSource {
    /// 音声が利用可能か
    ///
    /// ローカルファイルは存在確認を行う。外部 URL はここでは取得しないので
    /// 常に利用可能とみなす。
    pub fn is_available(&self) -> bool {
        match self {
            AudioSource::Local(path) => path.is_file(),
            AudioSource::Remote(_) => true,
        }
    }

    /// ファイル名（拡張子による MIME 推定やアップロード時の名前に使う）
    pub fn file_name(&self) -> String {
        let name = match self {
            AudioSource::Local(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
            AudioSource::Remote(url) => url
                .split(['?', '#'])
                .next()
                .and_then(|u| u.rsplit('/').next())
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        };
        name.unwrap_or_else(|| "audio".to_string())
    }
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioSource::Local(path) => write!(f, "{}", path.display()),
            AudioSource::Remote(url) => f.write_str(url),
        }
    }
}

/// 保存されている音声参照を解決
///
/// - `/` 始まり: 公開ディレクトリからの相対パス
/// - `http://` / `https://`: 外部 URL としてそのまま
/// - それ以外: パスとしてそのまま
///
/// 空の参照は `None`（音声なし）。
///
/// # Examples
///
/// ```
/// # use word_sync::audio::{resolve_audio, AudioSource};
/// # use std::path::PathBuf;
/// let src = resolve_audio("./public", "/audio/a.mp3").unwrap();
/// assert_eq!(src, AudioSource::Local(PathBuf::from("./public/audio/a.mp3")));
/// ```
pub fn resolve_audio<P: AsRef<Path>>(public_root: P, audio_url: &str) -> Option<AudioSource> {
    let audio_url = audio_url.trim();
    if audio_url.is_empty() {
        return None;
    }

    if let Some(relative) = audio_url.strip_prefix('/') {
        return Some(AudioSource::Local(public_root.as_ref().join(relative)));
    }

    if audio_url.starts_with("http://") || audio_url.starts_with("https://") {
        return Some(AudioSource::Remote(audio_url.to_string()));
    }

    Some(AudioSource::Local(PathBuf::from(audio_url)))
}

/// 拡張子から音声の MIME タイプを推定
pub fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" | "mpga" | "mpeg" => "audio/mpeg",
        "m4a" | "mp4" => "audio/mp4",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "webm" => "audio/webm",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}
