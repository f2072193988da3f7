use regex_lite::Regex;
use std::sync::OnceLock;

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("タグ検出用の正規表現が不正"))
}

/// HTML 本文をプレーンテキストに変換
///
/// タグ（`<...>`）をすべて空白1文字に置き換え、連続する空白を1つにまとめて
/// 前後を取り除く。エンティティ（`&nbsp;` など）はデコードしない。
///
/// # Examples
///
/// ```
/// # use word_sync::normalize::strip_html;
/// assert_eq!(strip_html(Some("<p>Olá,\n  <b>mundo</b></p>")), "Olá, mundo");
/// assert_eq!(strip_html(None), "");
/// ```
pub fn strip_html(html: Option<&str>) -> String {
    let Some(html) = html else {
        return String::new();
    };

    let without_tags = tag_regex().replace_all(html, " ");
    without_tags.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// マッピングで使う文字数
///
/// 文字数はバイト数ではなく Unicode スカラー値の個数で数える。
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
