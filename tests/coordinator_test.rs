mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{RecordingTarget, TestHost, create_article_html, test_config};
use readclip::agents::ReaderSurface;
use readclip::extractor::Article;
use readclip::host::SharedState;
use readclip::messaging::{ContextId, Message, MessageKind, PdfDownload, Reply};
use readclip::utils::{CURRENT_ARTICLE_KEY, SAVE_FAILED_TITLE};
use readclip::Coordinator;

#[tokio::test]
async fn reader_opened_gets_the_stored_article() {
    let host = TestHost::new(&test_config());
    let coordinator = Coordinator::new(host.orchestrator(test_config()));

    // Reader starts before anything is stored, then the article arrives
    let target = RecordingTarget::default();
    let reader = ContextId::new("reader-1");
    ReaderSurface::launch(reader.clone(), target.clone(), host.messenger.clone(), host.state.clone()).await;
    assert!(target.pages.lock().is_empty());

    let article = Article {
        title: "Late Arrival".into(),
        content: "<p>Text</p>".into(),
        ..Article::default()
    };
    host.state
        .set(CURRENT_ARTICLE_KEY, serde_json::to_value(&article).unwrap())
        .await
        .unwrap();

    coordinator.handle(&reader, Message::ReaderOpened).await;

    let pages = target.pages.lock().clone();
    assert_eq!(pages.len(), 1);
    assert!(pages[0].contains("Late Arrival"));
}

#[tokio::test]
async fn sidepanel_extraction_replies_with_article() {
    let host = TestHost::new(&test_config());
    let source = host
        .scripting
        .add_page("tab-7", &create_article_html(), "https://example.com/story");
    let coordinator = Coordinator::new(host.orchestrator(test_config()));
    let _listener = coordinator.listen();

    let answer = host
        .messenger
        .send_runtime(&ContextId::new("sidepanel"), Message::ExtractForSidepanel { tab_id: source })
        .await
        .expect("coordinator answers");

    let reply: Reply<Article> = serde_json::from_value(answer).unwrap();
    assert!(reply.success);
    assert_eq!(reply.data.unwrap().title, "Main Title");
}

#[tokio::test]
async fn sidepanel_failure_is_a_reply_not_an_error() {
    let host = TestHost::new(&test_config());
    let source = host.scripting.add_restricted("tab-internal");
    let coordinator = Coordinator::new(host.orchestrator(test_config()));

    let answer = coordinator
        .handle(&ContextId::new("sidepanel"), Message::ExtractForSidepanel { tab_id: source })
        .await
        .expect("request gets a reply");

    assert_eq!(answer["success"], false);
    assert_eq!(answer["error"], "Cannot extract content from this page type");
}

#[tokio::test]
async fn sidepanel_pdf_generation_returns_filename() {
    let host = TestHost::new(&test_config());
    let coordinator = Coordinator::new(host.orchestrator(test_config()));
    let _listener = coordinator.listen();

    let article = Article {
        title: "Panel Story".into(),
        content: "<p>Words</p>".into(),
        ..Article::default()
    };
    let answer = tokio::time::timeout(
        Duration::from_secs(5),
        host.messenger
            .send_runtime(&ContextId::new("sidepanel"), Message::GeneratePdfFromSidepanel { article }),
    )
    .await
    .expect("no deadlock")
    .expect("coordinator answers");

    let reply: Reply<String> = serde_json::from_value(answer).unwrap();
    assert!(reply.success, "{reply:?}");
    assert!(reply.data.unwrap().starts_with("Panel_Story_"));
    assert_eq!(host.capture.detach_count(), 1);
    assert_eq!(host.contexts.open_count(), 0);
}

#[tokio::test]
async fn save_as_pdf_notifies_on_failure() {
    let host = TestHost::new(&test_config());
    host.capture.fail_print.store(true, Ordering::SeqCst);
    let source = host
        .scripting
        .add_page("tab-1", &create_article_html(), "https://example.com/story");
    let coordinator = Coordinator::new(host.orchestrator(test_config()));

    assert!(coordinator.save_as_pdf(&source).await.is_none());

    let notifications = host.notifier.notifications.lock().clone();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].0, SAVE_FAILED_TITLE);
    assert!(notifications[0].1.contains("Page.printToPDF failed"));
}

#[tokio::test]
async fn save_as_pdf_is_silent_on_success() {
    let host = TestHost::new(&test_config());
    let source = host
        .scripting
        .add_page("tab-1", &create_article_html(), "https://example.com/story");
    let coordinator = Coordinator::new(host.orchestrator(test_config()));
    let _listener = coordinator.listen();

    let filename = coordinator.save_as_pdf(&source).await.expect("saved");
    assert!(filename.ends_with(".pdf"));
    assert!(host.notifier.notifications.lock().is_empty());
}

#[tokio::test]
async fn unrelated_runtime_messages_get_no_reply() {
    let host = TestHost::new(&test_config());
    let coordinator = Coordinator::new(host.orchestrator(test_config()));
    let answer = coordinator
        .handle(&ContextId::new("reader"), Message::ReaderReady)
        .await;
    assert!(answer.is_none());
}

#[tokio::test]
async fn reader_opened_does_not_redraw_the_shown_article() {
    let host = TestHost::new(&test_config());
    let coordinator = Coordinator::new(host.orchestrator(test_config()));

    let article = Article {
        title: "Main Title".into(),
        content: "<p>Body</p>".into(),
        ..Article::default()
    };
    host.state
        .set(CURRENT_ARTICLE_KEY, serde_json::to_value(&article).unwrap())
        .await
        .unwrap();

    let target = RecordingTarget::default();
    let reader = ContextId::new("reader-1");
    let surface =
        ReaderSurface::launch(reader.clone(), target.clone(), host.messenger.clone(), host.state.clone()).await;
    assert_eq!(surface.rendered_title().as_deref(), Some("Main Title"));

    let ready = host.messenger.subscribe(MessageKind::ReaderReady, &reader);
    coordinator.handle(&reader, Message::ReaderOpened).await;

    // Ready is announced again without touching the document
    ready.wait(Duration::from_millis(100)).await.expect("ready re-posted");
    assert_eq!(target.pages.lock().len(), 1);
}

#[tokio::test]
async fn listening_coordinator_leaves_one_render_per_capture() {
    let host = TestHost::new(&test_config());
    let coordinator = Coordinator::new(host.orchestrator(test_config()));
    let _listener = coordinator.listen();

    let article = Article {
        title: "Single Draw".into(),
        content: "<p>Words</p>".into(),
        ..Article::default()
    };
    coordinator
        .orchestrator()
        .capture_to_document(&article)
        .await
        .expect("capture succeeds");
    // Let the coordinator finish answering READER_OPENED
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(host.contexts.target.pages.lock().len(), 1);
}

#[tokio::test]
async fn reader_keeps_the_offered_download() {
    let host = TestHost::new(&test_config());
    let target = RecordingTarget::default();
    let reader = ContextId::new("reader-1");
    let surface =
        ReaderSurface::launch(reader.clone(), target.clone(), host.messenger.clone(), host.state.clone()).await;
    assert!(surface.rendered_title().is_none());

    let broken = PdfDownload {
        data_base64: "not base64!".into(),
        filename: "broken.pdf".into(),
    };
    host.messenger.deliver(&reader, Message::DownloadPdf(broken)).await.unwrap();
    assert!(surface.last_download().is_none());
    assert!(target.downloads.lock().is_empty());

    let download = PdfDownload {
        data_base64: "JVBERi0xLjQ=".into(),
        filename: "story.pdf".into(),
    };
    host.messenger
        .deliver(&reader, Message::DownloadPdf(download.clone()))
        .await
        .unwrap();
    assert_eq!(surface.last_download(), Some(download));
    assert_eq!(target.downloads.lock().len(), 1);
}
