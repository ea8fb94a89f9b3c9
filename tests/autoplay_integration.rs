use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use carousel_showcase::caption_store::JsonCaptionStore;
use carousel_showcase::config::Configuration;
use carousel_showcase::events::{NavCommand, SlideChanged};
use carousel_showcase::session::Session;
use carousel_showcase::tasks::autoplay;
use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn config(dir: &std::path::Path, interval: &str) -> Configuration {
    let yaml = format!(
        r#"
image-dir: "{}"
captions-path: "{}"
autoplay-poll: 10ms
carousels:
  - name: company
    prefix: empresa
    param: emp
    max-items: 3
    interval: {interval}
"#,
        dir.display(),
        dir.join("captions.json").display()
    );
    let cfg: Configuration = serde_yaml::from_str(&yaml).unwrap();
    cfg.validated().unwrap()
}

fn seed_images(dir: &std::path::Path) {
    for i in 1..=3 {
        fs::write(dir.join(format!("empresa{i}.jpg")), b"x").unwrap();
    }
}

async fn recv(rx: &mut mpsc::Receiver<SlideChanged>) -> SlideChanged {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timeout waiting for slide")
        .expect("autoplay channel closed")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn autoplay_advances_and_wraps() {
    let tmp = tempdir().unwrap();
    seed_images(tmp.path());
    let cfg = config(tmp.path(), "100ms");
    let store = Arc::new(JsonCaptionStore::new(cfg.captions_path.clone()));
    let session = Session::start(&cfg, store, Instant::now());

    let (_cmd_tx, cmd_rx) = mpsc::channel::<NavCommand>(4);
    let (tx, mut rx) = mpsc::channel::<SlideChanged>(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(autoplay::run(
        session,
        cfg.autoplay_poll,
        cmd_rx,
        tx,
        cancel.clone(),
    ));

    let indices = [
        recv(&mut rx).await.index,
        recv(&mut rx).await.index,
        recv(&mut rx).await.index,
    ];
    assert_eq!(indices, [1, 2, 0]);

    cancel.cancel();
    let session = handle.await.unwrap().unwrap();
    assert_eq!(session.carousels().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn commands_navigate_and_bad_input_is_ignored() {
    let tmp = tempdir().unwrap();
    seed_images(tmp.path());
    fs::write(
        tmp.path().join("captions.json"),
        r#"{"empresa3": "Certified Facility"}"#,
    )
    .unwrap();
    let cfg = config(tmp.path(), "1h");
    let store = Arc::new(JsonCaptionStore::new(cfg.captions_path.clone()));
    let session = Session::start(&cfg, store, Instant::now());

    let (cmd_tx, cmd_rx) = mpsc::channel::<NavCommand>(4);
    let (tx, mut rx) = mpsc::channel::<SlideChanged>(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(autoplay::run(
        session,
        cfg.autoplay_poll,
        cmd_rx,
        tx,
        cancel.clone(),
    ));

    cmd_tx
        .send(NavCommand::Prev {
            carousel: "company".into(),
        })
        .await
        .unwrap();
    let slide = recv(&mut rx).await;
    assert_eq!(slide.index, 2);
    assert_eq!(slide.caption, "Certified Facility");

    cmd_tx
        .send(NavCommand::JumpTo {
            carousel: "company".into(),
            raw: "abc".into(),
        })
        .await
        .unwrap();
    cmd_tx
        .send(NavCommand::Next {
            carousel: "missing".into(),
        })
        .await
        .unwrap();
    cmd_tx
        .send(NavCommand::JumpTo {
            carousel: "company".into(),
            raw: "4".into(),
        })
        .await
        .unwrap();
    let slide = recv(&mut rx).await;
    assert_eq!(slide.index, 1);
    assert_eq!(slide.caption, "Empresa2");

    cancel.cancel();
    let _ = handle.await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_session_stays_quiet_until_cancelled() {
    let tmp = tempdir().unwrap();
    let cfg = config(tmp.path(), "20ms");
    let store = Arc::new(JsonCaptionStore::new(cfg.captions_path.clone()));
    let session = Session::start(&cfg, store, Instant::now());

    let (_cmd_tx, cmd_rx) = mpsc::channel::<NavCommand>(4);
    let (tx, mut rx) = mpsc::channel::<SlideChanged>(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(autoplay::run(
        session,
        cfg.autoplay_poll,
        cmd_rx,
        tx,
        cancel.clone(),
    ));

    let none = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(none.is_err(), "empty carousel should never report a slide");

    cancel.cancel();
    let session = handle.await.unwrap().unwrap();
    assert!(session.carousel("company").unwrap().is_empty());
}

#[test]
fn console_lines_parse_into_commands() {
    assert_eq!(
        NavCommand::parse_line("next", "hero"),
        Some(NavCommand::Next {
            carousel: "hero".into()
        })
    );
    assert_eq!(
        NavCommand::parse_line("p company", "hero"),
        Some(NavCommand::Prev {
            carousel: "company".into()
        })
    );
    assert_eq!(
        NavCommand::parse_line("company 2", "hero"),
        Some(NavCommand::JumpTo {
            carousel: "company".into(),
            raw: "2".into()
        })
    );
    assert_eq!(NavCommand::parse_line("company", "hero"), None);
    assert_eq!(NavCommand::parse_line("   ", "hero"), None);
}
