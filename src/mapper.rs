use crate::normalize::char_len;
use crate::types::{LinePoint, SyncEntry, WordSegment};

/// 単語列をセクションに割り当てる
///
/// 各セクションの文字数（最低1）を「持ち分」とし、単語の文字数（最低1）を
/// 先頭から積み上げていく。累積文字数が現在のセクションの境界に達したら
/// 次のセクションへ進む。最後のセクションより先には進まないので、
/// 余った単語はすべて最後のセクションに入る。
///
/// - 出力の長さは常に `words.len()` と等しい
/// - セクション番号は単調非減少で `0..section_texts.len()` に収まる
/// - セクションが進んだ時点で単語番号は 0 に戻る
///
/// `section_texts` が空の場合は空のセクションが1つあるものとして扱う。
///
/// # Examples
///
/// ```
/// # use word_sync::mapper::map_words_to_sections;
/// # use word_sync::types::WordSegment;
/// let words = vec![
///     WordSegment::new("a", Some(0.0)),
///     WordSegment::new("b", Some(0.1)),
///     WordSegment::new("c", Some(0.2)),
///     WordSegment::new("d", Some(0.3)),
/// ];
/// let sections = vec!["ab".to_string(), "abcd".to_string()];
/// let entries = map_words_to_sections(&words, &sections);
/// let indices: Vec<usize> = entries.iter().map(|e| e.i).collect();
/// assert_eq!(indices, vec![0, 0, 1, 1]);
/// ```
pub fn map_words_to_sections(words: &[WordSegment], section_texts: &[String]) -> Vec<SyncEntry> {
    let weights: Vec<usize> = if section_texts.is_empty() {
        vec![1]
    } else {
        section_texts.iter().map(|s| char_len(s).max(1)).collect()
    };
    let last = weights.len() - 1;

    let mut acc_chars = 0usize;
    let mut sec_i = 0usize;
    let mut idx_in_sec = 0usize;
    let mut next_boundary = weights[0];

    let mut result = Vec::with_capacity(words.len());
    for word in words {
        while acc_chars >= next_boundary && sec_i < last {
            acc_chars = next_boundary;
            sec_i += 1;
            idx_in_sec = 0;
            next_boundary += weights[sec_i];
        }

        result.push(SyncEntry {
            t: seconds_to_ms(word.start),
            i: sec_i,
            w: idx_in_sec,
            text: word.word.clone(),
        });

        acc_chars += char_len(&word.word).max(1);
        idx_in_sec += 1;
    }

    result
}

/// 開始時刻（秒）をミリ秒に変換
///
/// 欠落・NaN・無限大は 0。負値はそのまま変換する。
/// 丸めは偶数丸め（0.5 ms ちょうどは偶数側）。
pub fn seconds_to_ms(start: Option<f64>) -> i64 {
    match start {
        Some(s) if s.is_finite() => (s * 1000.0).round_ties_even() as i64,
        _ => 0,
    }
}

/// セクション単位の同期ポイントを推定
///
/// ASR を使わず、音声全体の長さをセクションの文字数（0 は 1 とみなす）で
/// 按分して各セクションの開始時刻を求める。
///
/// # Examples
///
/// ```
/// # use word_sync::mapper::estimate_line_points;
/// let sections = vec!["abc".to_string(), "d".to_string()];
/// let points = estimate_line_points(&sections, 4000);
/// assert_eq!(points[0].t, 0);
/// assert_eq!(points[1].t, 3000);
/// ```
pub fn estimate_line_points(section_texts: &[String], duration_ms: i64) -> Vec<LinePoint> {
    let lengths: Vec<usize> = section_texts
        .iter()
        .map(|s| match char_len(s) {
            0 => 1,
            n => n,
        })
        .collect();
    let total: usize = lengths.iter().sum();
    if total == 0 {
        return Vec::new();
    }

    let mut acc = 0usize;
    lengths
        .iter()
        .enumerate()
        .map(|(i, len)| {
            let t = ((acc as f64 / total as f64) * duration_ms as f64).round() as i64;
            acc += len;
            LinePoint { t, i }
        })
        .collect()
}
