use anyhow::{bail, Context, Result};
use env_logger::Env;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use word_sync::aligner::WordAligner;
use word_sync::config::{AlignerBackendType, Config};
use word_sync::pipeline::{PipelineOptions, SyncPipeline};
use word_sync::postgres::PgSyncStore;
use word_sync::sidecar::SidecarAligner;
use word_sync::store::SyncStore;
use word_sync::whisper_api::WhisperAligner;

const DEFAULT_CONFIG_PATH: &str = "word-sync.toml";

/// 実行モード
#[derive(Debug, PartialEq, Eq)]
enum Mode {
    /// 単語単位の同期マップを生成
    Words,
    /// セクション単位の推定同期マップを生成
    EstimateLines,
    /// 保存済み同期マップの概要を表示
    Check(Vec<String>),
    /// 設定ファイルのテンプレートを生成
    GenerateConfig(String),
}

#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    mode: Mode,
    config_path: String,
    only_slug: Option<String>,
}

/// コマンドライン引数をパース
///
/// `--slug` が無い場合は環境変数 `ONLY_SLUG` を使う（`env_slug`）。
fn parse_args(args: &[String], env_slug: Option<String>) -> Result<CliArgs> {
    let mut mode = Mode::Words;
    let mut config_path = DEFAULT_CONFIG_PATH.to_string();
    let mut only_slug = None;

    let mut iter = args.iter().skip(1).peekable();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--slug" => {
                let slug = iter.next().context("--slug には値が必要です")?;
                only_slug = Some(slug.clone());
            }
            "--config" => {
                config_path = iter.next().context("--config には値が必要です")?.clone();
            }
            "--estimate-lines" => mode = Mode::EstimateLines,
            "--check" => {
                let mut slugs = Vec::new();
                while let Some(next) = iter.peek() {
                    if next.starts_with("--") {
                        break;
                    }
                    slugs.extend(iter.next().cloned());
                }
                mode = Mode::Check(slugs);
            }
            "--generate-config" => {
                let path = match iter.peek() {
                    Some(next) if !next.starts_with("--") => iter.next().cloned(),
                    _ => None,
                };
                mode = Mode::GenerateConfig(path.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()));
            }
            other if !other.starts_with("--") => config_path = other.to_string(),
            other => bail!("不明なオプション: {}", other),
        }
    }

    let only_slug = only_slug.or(env_slug.filter(|s| !s.trim().is_empty()));
    Ok(CliArgs {
        mode,
        config_path,
        only_slug,
    })
}

/// 設定に従ってアライナを作成
fn build_aligner(config: &Config) -> Result<Box<dyn WordAligner>> {
    match config.transcribe.backend {
        AlignerBackendType::Whisper => {
            let whisper = config
                .whisper
                .clone()
                .context("backend = \"whisper\" には [whisper] 設定が必要です")?;
            log::info!("Whisper API バックエンドを使用 (model={})", whisper.model);
            Ok(Box::new(WhisperAligner::new(whisper)?))
        }
        AlignerBackendType::Sidecar => {
            log::info!(
                "単語区間ファイルを使用 (suffix={})",
                config.sidecar.suffix
            );
            Ok(Box::new(SidecarAligner::new(&config.sidecar)))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ロガーを初期化
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .filter_module("sqlx", log::LevelFilter::Warn)
        .filter_module("reqwest", log::LevelFilter::Warn)
        .filter_module("hyper", log::LevelFilter::Warn)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli = parse_args(&args, std::env::var("ONLY_SLUG").ok())?;

    if let Mode::GenerateConfig(path) = &cli.mode {
        Config::write_default(path)?;
        println!("設定ファイルを生成しました: {}", path);
        return Ok(());
    }

    // 設定・接続先はここで一度だけ解決する（失敗したら何も処理しない）
    let config = Config::load_or_default(&cli.config_path)?;
    log::debug!("設定: {:?}", config);
    let database_url = config.database.resolve_url(|key| std::env::var(key).ok())?;

    let store = PgSyncStore::connect(&database_url, &config.database).await?;

    if let Mode::Check(slugs) = &cli.mode {
        if slugs.is_empty() {
            println!("sync_map rows: {}", store.sync_map_count().await?);
        }
        let summaries = store.sync_map_summaries(slugs).await?;
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        store.close().await;
        return Ok(());
    }

    let aligner: Box<dyn WordAligner> = match cli.mode {
        Mode::Words => build_aligner(&config)?,
        // 推定マップではアライナを使わない
        _ => Box::new(SidecarAligner::new(&config.sidecar)),
    };

    // Ctrl+C ハンドラを設定（処理中のアイテムが終わってから停止）
    let stop = Arc::new(AtomicBool::new(false));
    let stop_clone = stop.clone();
    ctrlc::set_handler(move || {
        log::info!("停止シグナルを受信しました。現在のアイテムの完了後に停止します...");
        stop_clone.store(true, Ordering::SeqCst);
    })?;

    let options = PipelineOptions {
        public_root: PathBuf::from(&config.audio.public_root),
        default_language: config.transcribe.language.clone(),
    };
    let pipeline = SyncPipeline::new(store, aligner, options);

    if let Some(slug) = &cli.only_slug {
        log::info!("対象を slug={} に限定します", slug);
    }

    let result = match cli.mode {
        Mode::EstimateLines => pipeline.run_lines(cli.only_slug.as_deref(), &stop).await,
        _ => pipeline.run_words(cli.only_slug.as_deref(), &stop).await,
    };
    pipeline.store().close().await;
    let report = result?;

    log::info!(
        "完了: 成功 {} 件 / スキップ {} 件 / 失敗 {} 件{}",
        report.succeeded(),
        report.skipped(),
        report.failed(),
        if report.interrupted { "（中断）" } else { "" }
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
